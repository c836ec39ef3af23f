//! Blog API Example
//!
//! Serves two schemas declared in `schema.yaml`:
//! - `default`: queries and a validated `createPost` mutation
//! - `public`: a read-only view, rebuilt after every request

use anyhow::Result;
use serde_json::{Map, Value, json};
use std::sync::{Arc, RwLock};
use this_gql::prelude::*;
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = include_str!("schema.yaml");

/// In-memory post store shared by the resolvers
#[derive(Clone, Default)]
struct PostStore {
    posts: Arc<RwLock<Vec<Value>>>,
}

impl PostStore {
    fn seeded() -> Self {
        let store = Self::default();
        store.insert(json!({
            "title": "Hello GraphQL",
            "status": "PUBLISHED",
            "author_name": "ada",
        }));
        store
    }

    fn insert(&self, mut post: Value) -> Value {
        let Ok(mut posts) = self.posts.write() else {
            return Value::Null;
        };
        post["id"] = json!((posts.len() + 1).to_string());
        posts.push(post.clone());
        post
    }

    fn list(&self, limit: usize) -> Vec<Value> {
        self.posts
            .read()
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    fn get(&self, id: &str) -> Option<Value> {
        self.posts
            .read()
            .ok()?
            .iter()
            .find(|post| post["id"] == id)
            .cloned()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,this_gql=debug")),
        )
        .init();

    let store = PostStore::seeded();
    let list_store = store.clone();
    let get_store = store.clone();
    let create_store = store.clone();

    let builder = RuntimeBuilder::new()
        .with_config(SchemaConfig::from_yaml_str(SCHEMA)?)
        .with_resolver("ping", || resolver_fn(|_| Ok(json!("pong"))))
        .with_resolver("post.list", move || {
            let store = list_store.clone();
            resolver_fn(move |info| {
                let limit = info.arg_i64("limit").unwrap_or(10).max(0) as usize;
                Ok(Value::Array(store.list(limit)))
            })
        })
        .with_resolver("post.get", move || {
            let store = get_store.clone();
            resolver_fn(move |info| {
                let id = info
                    .arg_str("id")
                    .ok_or_else(|| anyhow::anyhow!("id is required"))?;
                Ok(store.get(id).unwrap_or(Value::Null))
            })
        })
        .with_resolver("post.create", move || {
            let store = create_store.clone();
            resolver_fn(move |info| {
                let input = info
                    .arg("input")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_else(Map::new);
                Ok(store.insert(Value::Object(input)))
            })
        })
        .reset_between_requests(true);

    println!("\n🌐 Server running on http://127.0.0.1:3000");
    println!("\n📚 Available endpoints:");
    println!("    POST   /graphql                 - Default schema");
    println!("    POST   /graphql/public          - Read-only schema");
    println!("    GET    /graphql/schemas         - Schema names");
    println!("\n  Example queries:");
    println!("    {{ posts {{ id title status authorName }} }}");
    println!("    mutation {{ createPost(input: {{ title: \"Second post\" }}) {{ id status }} }}");

    builder.serve("127.0.0.1:3000").await
}
