//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own:
//! - password hashing and session lifetimes
//! - ownership checks on post mutations
//! - author population

pub mod author;
pub mod password;
pub mod post;
pub mod session_cookie;
pub mod user;

pub use author::AuthorService;
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use session_cookie::SessionSigner;
pub use user::{UserService, UserServiceError};
