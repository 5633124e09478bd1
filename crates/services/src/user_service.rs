//! User profiles and forum participant listings.

use std::sync::Arc;

use domains::{
    DomainError, DomainResult, ForumRepository, NewUser, User, UserListQuery, UserRepository,
    UserUpdate,
};
use tracing::{debug, instrument};

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Created(User),
    /// Nickname or email already taken; every colliding user is returned.
    Taken(Vec<User>),
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    forums: Arc<dyn ForumRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, forums: Arc<dyn ForumRepository>) -> Self {
        Self { users, forums }
    }

    #[instrument(skip(self, profile))]
    pub async fn register(&self, nickname: &str, profile: NewUser) -> DomainResult<Registration> {
        let user = profile.into_user(nickname);
        match self.users.insert_user(&user).await {
            Ok(()) => Ok(Registration::Created(user)),
            Err(DomainError::Conflict(reason)) => {
                debug!(%reason, "registration collides with existing users");
                let taken = self.users.find_conflicting_users(&user.nickname, &user.email).await?;
                if taken.is_empty() {
                    return Err(DomainError::Conflict(reason));
                }
                Ok(Registration::Taken(taken))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn profile(&self, nickname: &str) -> DomainResult<User> {
        self.users
            .find_user(nickname)
            .await?
            .ok_or_else(|| DomainError::not_found("user", nickname))
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, nickname: &str, update: UserUpdate) -> DomainResult<User> {
        let update = update.normalized();
        if update.is_empty() {
            return self.profile(nickname).await;
        }
        self.users
            .update_user(nickname, &update)
            .await?
            .ok_or_else(|| DomainError::not_found("user", nickname))
    }

    pub async fn forum_users(&self, forum: &str, query: &UserListQuery) -> DomainResult<Vec<User>> {
        let forum = self
            .forums
            .find_forum(forum)
            .await?
            .ok_or_else(|| DomainError::not_found("forum", forum))?;
        self.users.list_forum_users(&forum.slug, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Forum, MockForumRepository, MockUserRepository};
    use tokio_test::{assert_err, assert_ok};

    fn user(nickname: &str, email: &str) -> User {
        User {
            nickname: nickname.into(),
            fullname: "Full Name".into(),
            about: String::new(),
            email: email.into(),
        }
    }

    fn service(users: MockUserRepository, forums: MockForumRepository) -> UserService {
        UserService::new(Arc::new(users), Arc::new(forums))
    }

    #[tokio::test]
    async fn register_returns_colliding_users_on_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_insert_user()
            .returning(|_| Err(DomainError::Conflict("duplicate key".into())));
        users
            .expect_find_conflicting_users()
            .withf(|nick, email| nick == "bob" && email == "a@x.org")
            .returning(|_, _| Ok(vec![user("Alice", "a@x.org"), user("BOB", "b@x.org")]));

        let svc = service(users, MockForumRepository::new());
        let profile = NewUser { email: "a@x.org".into(), ..Default::default() };
        let outcome = assert_ok!(svc.register("bob", profile).await);
        match outcome {
            Registration::Taken(list) => assert_eq!(list.len(), 2),
            other => panic!("expected Taken, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_creates_with_route_nickname() {
        let mut users = MockUserRepository::new();
        users.expect_insert_user().withf(|u| u.nickname == "carol").returning(|_| Ok(()));

        let svc = service(users, MockForumRepository::new());
        let outcome = assert_ok!(svc.register("carol", NewUser::default()).await);
        assert!(matches!(outcome, Registration::Created(u) if u.nickname == "carol"));
    }

    #[tokio::test]
    async fn empty_update_reads_current_profile() {
        let mut users = MockUserRepository::new();
        users.expect_update_user().never();
        users.expect_find_user().returning(|_| Ok(Some(user("dave", "d@x.org"))));

        let svc = service(users, MockForumRepository::new());
        let update = UserUpdate { about: Some(String::new()), ..Default::default() };
        let u = assert_ok!(svc.update_profile("dave", update).await);
        assert_eq!(u.email, "d@x.org");
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_update_user().returning(|_, _| Ok(None));

        let svc = service(users, MockForumRepository::new());
        let update = UserUpdate { fullname: Some("New".into()), ..Default::default() };
        let err = assert_err!(svc.update_profile("ghost", update).await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn forum_users_use_canonical_forum_slug() {
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| {
            Ok(Some(Forum {
                slug: "Rust".into(),
                title: "t".into(),
                user: "alice".into(),
                posts: 0,
                threads: 0,
            }))
        });
        let mut users = MockUserRepository::new();
        users
            .expect_list_forum_users()
            .withf(|slug, _| slug == "Rust")
            .returning(|_, _| Ok(vec![]));

        let svc = service(users, forums);
        assert_ok!(svc.forum_users("rust", &UserListQuery::default()).await);
    }

    #[tokio::test]
    async fn forum_users_of_missing_forum_is_not_found() {
        let mut forums = MockForumRepository::new();
        forums.expect_find_forum().returning(|_| Ok(None));

        let svc = service(MockUserRepository::new(), forums);
        let err = assert_err!(svc.forum_users("nope", &UserListQuery::default()).await);
        assert_eq!(err, DomainError::not_found("forum", "nope"));
    }
}
