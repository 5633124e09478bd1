use std::sync::Arc;

use domains::{
    CreateOutcome, DomainError, DomainResult, Forum, ForumRepository, NewForum, UserRepository,
};
use tracing::{info, instrument};

#[derive(Clone)]
pub struct ForumService {
    forums: Arc<dyn ForumRepository>,
    users: Arc<dyn UserRepository>,
}

impl ForumService {
    pub fn new(forums: Arc<dyn ForumRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { forums, users }
    }

    /// Creates a forum owned by an existing user. A taken slug yields the
    /// forum that already holds it.
    #[instrument(skip(self, forum), fields(slug = %forum.slug))]
    pub async fn create(&self, forum: NewForum) -> DomainResult<CreateOutcome<Forum>> {
        let owner = self
            .users
            .find_user(&forum.user)
            .await?
            .ok_or_else(|| DomainError::not_found("user", &forum.user))?;

        match self.forums.insert_forum(&forum, &owner.nickname).await {
            Ok(created) => {
                info!(slug = %created.slug, owner = %created.user, "forum created");
                Ok(CreateOutcome::Created(created))
            }
            Err(DomainError::Conflict(reason)) => match self.forums.find_forum(&forum.slug).await? {
                Some(existing) => Ok(CreateOutcome::AlreadyExists(existing)),
                None => Err(DomainError::Conflict(reason)),
            },
            Err(e) => Err(e),
        }
    }

    pub async fn details(&self, slug: &str) -> DomainResult<Forum> {
        self.forums
            .find_forum(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockForumRepository, MockUserRepository, User};
    use tokio_test::{assert_err, assert_ok};

    fn new_forum() -> NewForum {
        NewForum { slug: "pirates".into(), title: "Pirates".into(), user: "JACK".into() }
    }

    fn stored(owner: &str) -> Forum {
        Forum { slug: "pirates".into(), title: "Pirates".into(), user: owner.into(), posts: 0, threads: 0 }
    }

    fn owner_exists() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| {
            Ok(Some(User {
                nickname: "jack".into(),
                fullname: "Jack".into(),
                about: String::new(),
                email: "jack@sea".into(),
            }))
        });
        users
    }

    #[tokio::test]
    async fn owner_nickname_is_canonicalized() {
        let mut forums = MockForumRepository::new();
        forums
            .expect_insert_forum()
            .withf(|_, owner| owner == "jack")
            .returning(|_, owner| Ok(stored(owner)));

        let svc = ForumService::new(Arc::new(forums), Arc::new(owner_exists()));
        let outcome = assert_ok!(svc.create(new_forum()).await);
        assert_eq!(outcome, CreateOutcome::Created(stored("jack")));
    }

    #[tokio::test]
    async fn duplicate_slug_returns_existing_forum() {
        let mut forums = MockForumRepository::new();
        forums
            .expect_insert_forum()
            .returning(|_, _| Err(DomainError::Conflict("slug taken".into())));
        forums.expect_find_forum().returning(|_| Ok(Some(stored("someone"))));

        let svc = ForumService::new(Arc::new(forums), Arc::new(owner_exists()));
        let outcome = assert_ok!(svc.create(new_forum()).await);
        assert_eq!(outcome, CreateOutcome::AlreadyExists(stored("someone")));
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| Ok(None));
        let mut forums = MockForumRepository::new();
        forums.expect_insert_forum().never();

        let svc = ForumService::new(Arc::new(forums), Arc::new(users));
        let err = assert_err!(svc.create(new_forum()).await);
        assert_eq!(err, DomainError::not_found("user", "JACK"));
    }
}
