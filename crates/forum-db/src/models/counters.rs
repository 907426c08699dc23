//! Counter columns of the posts and comments tables

use sqlx::FromRow;

#[derive(Debug, Clone, Copy, FromRow)]
pub struct CounterModel {
    pub like_count: i64,
    pub dislike_count: i64,
    pub favorite_count: i64,
    pub view_count: i64,
}
