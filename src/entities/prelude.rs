pub use super::catalog_entries::Entity as CatalogEntries;
pub use super::users::Entity as Users;
