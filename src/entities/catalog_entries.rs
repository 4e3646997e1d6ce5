use sea_orm::entity::prelude::*;

/// One indexed part: the part code and the directory holding its photos.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_entries")]
pub struct Model {
    /// Part code, taken verbatim from the directory name.
    #[sea_orm(primary_key, auto_increment = false)]
    pub part_code: String,

    /// Absolute path of the photo directory as seen at index time.
    pub directory_path: String,

    pub last_indexed_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
