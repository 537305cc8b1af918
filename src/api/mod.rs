pub mod callback;

pub use callback::CallbackListener;
