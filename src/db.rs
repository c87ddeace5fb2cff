/// Treats a foreign-key violation as "no row".
///
/// `INSERT ... SELECT` reads its parent row before the FK check runs, so a
/// parent deleted in between fails the insert instead of selecting nothing.
/// Both mean the parent is gone.
pub fn fk_race_as_none<T>(res: Result<Option<T>, sqlx::Error>) -> Result<Option<T>, sqlx::Error> {
    match res {
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            tracing::debug!(constraint = ?e.constraint(), "parent row vanished during insert");
            Ok(None)
        }
        other => other,
    }
}
