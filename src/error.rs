#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("an exercise is required to calculate a priority")]
    MissingExercise,
    #[error("priority upsert for bookmark {bookmark_id} still conflicting after {attempts} attempts")]
    PriorityConflict { bookmark_id: i64, attempts: u32 },
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
