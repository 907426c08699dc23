//! Counter columns -> snapshot

use forum_core::entities::CounterSnapshot;

use crate::models::CounterModel;

impl From<CounterModel> for CounterSnapshot {
    fn from(model: CounterModel) -> Self {
        CounterSnapshot::new(
            model.like_count,
            model.dislike_count,
            model.favorite_count,
            model.view_count,
        )
    }
}
