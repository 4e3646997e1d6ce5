pub mod prelude;

pub mod catalog_entries;
pub mod users;
