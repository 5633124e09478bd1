#![allow(dead_code)]

use std::sync::Arc;

use domains::{NewForum, NewPost, NewThread, NewUser, Post, PostId, Thread, ThreadRef};
use services::Services;
use storage_adapters::MemoryStore;

#[cfg(feature = "web-axum")]
pub mod http;

pub fn services() -> Services {
    Services::new(Arc::new(MemoryStore::new()))
}

pub fn profile(email: &str) -> NewUser {
    NewUser {
        fullname: "Test User".into(),
        about: String::new(),
        email: email.into(),
    }
}

pub fn draft(author: &str, parent: Option<PostId>, message: &str) -> NewPost {
    NewPost { parent, author: author.into(), message: message.into() }
}

/// Users `alice` and `bob`, forum `pirates` owned by alice, thread `voyage`.
pub async fn seed(services: &Services) -> Thread {
    services.users.register("alice", profile("alice@sea.org")).await.unwrap();
    services.users.register("bob", profile("bob@sea.org")).await.unwrap();
    services
        .forums
        .create(NewForum { slug: "pirates".into(), title: "Pirates".into(), user: "alice".into() })
        .await
        .unwrap();
    services
        .threads
        .create(
            "pirates",
            NewThread {
                slug: Some("voyage".into()),
                title: "Voyage".into(),
                author: "alice".into(),
                message: "Where to?".into(),
                created: None,
            },
        )
        .await
        .unwrap()
        .into_inner()
}

/// Posts the drafts one batch at a time, returning the stored posts in order.
pub async fn add(services: &Services, thread: &Thread, batch: Vec<NewPost>) -> Vec<Post> {
    services.posts.add_posts(&ThreadRef::Id(thread.id), batch).await.unwrap()
}

pub fn ids(posts: &[Post]) -> Vec<PostId> {
    posts.iter().map(|p| p.id).collect()
}
