//! Data models
//!
//! Database entities (User, Session, Author, Post with embedded Comments)
//! and the input types services accept.

mod author;
mod comment;
mod id;
mod post;
mod session;
mod user;

pub use author::Author;
pub use comment::Comment;
pub use id::DocumentId;
pub use post::{AuthorDocument, CreatePostInput, PopulatedPost, Post, UpdatePostInput};
pub use session::Session;
pub use user::{CreateUserInput, User};
