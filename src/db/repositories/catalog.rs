use crate::entities::{catalog_entries, prelude::*};
use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};

pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Upsert one catalog entry: insert the part code, or overwrite the
    /// directory path and refresh the timestamp if the code already exists.
    pub async fn upsert(&self, part_code: &str, directory_path: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = catalog_entries::ActiveModel {
            part_code: Set(part_code.to_string()),
            directory_path: Set(directory_path.to_string()),
            last_indexed_at: Set(now),
        };

        CatalogEntries::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(catalog_entries::Column::PartCode)
                    .update_columns([
                        catalog_entries::Column::DirectoryPath,
                        catalog_entries::Column::LastIndexedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to upsert catalog entry for '{part_code}'"))?;

        Ok(())
    }

    pub async fn get(&self, part_code: &str) -> Result<Option<catalog_entries::Model>> {
        let entry = CatalogEntries::find_by_id(part_code)
            .one(&self.conn)
            .await
            .with_context(|| format!("Failed to query catalog entry for '{part_code}'"))?;

        Ok(entry)
    }

    /// Every known part code, lexicographically ordered.
    pub async fn list_part_codes(&self) -> Result<Vec<String>> {
        let codes: Vec<String> = CatalogEntries::find()
            .select_only()
            .column(catalog_entries::Column::PartCode)
            .order_by_asc(catalog_entries::Column::PartCode)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list part codes")?;

        Ok(codes)
    }
}
