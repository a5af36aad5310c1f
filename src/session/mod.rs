pub mod card;
pub mod ledger;
pub mod lookup;
pub mod marks;
pub mod model;
pub mod refresh;
pub mod slots;
pub mod summary;
pub mod undo;
pub mod wrap_up;
