//! Use cases of the forum service, written against the `domains` ports only.

pub mod forum_service;
pub mod post_service;
pub mod status_service;
pub mod thread_service;
pub mod user_service;

use std::sync::Arc;

use domains::{ForumRepository, PostRepository, ServiceRepository, ThreadRepository, UserRepository};

pub use forum_service::ForumService;
pub use post_service::{PostListing, PostService};
pub use status_service::StatusService;
pub use thread_service::ThreadService;
pub use user_service::{Registration, UserService};

/// Every service, wired to one storage backend.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub forums: ForumService,
    pub threads: ThreadService,
    pub posts: PostService,
    pub status: StatusService,
}

impl Services {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + ForumRepository + ThreadRepository + PostRepository + ServiceRepository + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let forums: Arc<dyn ForumRepository> = store.clone();
        let threads: Arc<dyn ThreadRepository> = store.clone();
        let posts: Arc<dyn PostRepository> = store.clone();
        let admin: Arc<dyn ServiceRepository> = store;

        Self {
            users: UserService::new(users.clone(), forums.clone()),
            forums: ForumService::new(forums.clone(), users.clone()),
            threads: ThreadService::new(threads.clone(), forums.clone(), users.clone()),
            posts: PostService::new(posts, threads, forums, users),
            status: StatusService::new(admin),
        }
    }
}
