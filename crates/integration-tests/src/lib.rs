//! End-to-end tests across services, the in-memory store and the HTTP router.
//! Everything lives under `tests/`; shared fixtures are in `tests/common`.
