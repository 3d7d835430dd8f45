//! Category listing

use axum::Json;
use serde::Serialize;

use tally_core::Category;

#[derive(Serialize)]
pub struct CategoryInfo {
    pub name: &'static str,
    /// Counts toward the debt ratio of the health score
    pub debt: bool,
}

/// GET /api/categories - Every category a transaction can carry
pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(
        Category::ALL
            .iter()
            .map(|c| CategoryInfo {
                name: c.as_str(),
                debt: c.is_debt(),
            })
            .collect(),
    )
}
