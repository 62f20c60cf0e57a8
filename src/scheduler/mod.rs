mod selector;
mod updater;

pub use selector::select_study_batch;
pub use updater::update_priorities;
