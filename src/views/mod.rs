pub mod chat;
pub mod composer;
pub mod lightbox;
pub mod settings;
pub mod toast;

pub use chat::ChatView;
pub use composer::Composer;
pub use lightbox::LightboxView;
pub use settings::ChatHeader;
pub use toast::ToastHost;
