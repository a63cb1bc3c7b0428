use mongodb::{bson::doc, Database, IndexModel};

use super::monitor_store::MONITORS;

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // monitors: owner listing sorted by last check
    {
        let col = db.collection::<mongodb::bson::Document>(MONITORS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "last_checked": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}
