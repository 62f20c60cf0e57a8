pub mod bookmarks;
pub mod exercises;
pub mod priorities;
pub mod sessions;
pub mod users;
