pub mod debounce;
pub mod navigator;
pub mod transitions;
pub mod view_model;

pub use debounce::{Admission, DebouncePolicy, QueryDebouncer};
pub use navigator::{LoggingNavigator, Navigator};
pub use transitions::{LoggingTransitionObserver, Transition, TransitionObserver};
pub use view_model::{SearchViewModel, SearchViewModelParts, VIEW_MODEL_TAG, ViewModelError};
