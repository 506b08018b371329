/// A code-to-origin mapping from the `urls` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Mapping {
    pub code: String,
    pub origin: String,
}
