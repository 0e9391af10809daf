use crate::toast::ToastPhase;
use crate::ui::{ChatHandle, dismiss_toast};
use dioxus::prelude::*;

#[component]
pub fn ToastHost() -> Element {
    let handle = use_context::<ChatHandle>();
    let toasts = handle.toasts;
    let current = toasts.read().current().cloned();

    rsx! {
        div { class: "toast-container", aria_live: "polite",
            if let Some(toast) = current {
                {
                    let id = toast.id;
                    let phase = if toast.phase == ToastPhase::Hiding { "hide" } else { "show" };
                    let kind = toast.kind.css_class();
                    let icon = toast.kind.icon();
                    let title = toast.kind.title();
                    let message = toast.message;
                    rsx! {
                        div { key: "{id}", class: "toast {kind} {phase}", role: "status",
                            div { class: "toast-icon", "{icon}" }
                            div { class: "toast-content",
                                div { class: "toast-title", "{title}" }
                                div { class: "toast-message", "{message}" }
                            }
                            button {
                                class: "toast-close",
                                r#type: "button",
                                aria_label: "Close notification",
                                onclick: move |_| {
                                    spawn(dismiss_toast(toasts, id));
                                },
                                "×"
                            }
                        }
                    }
                }
            }
        }
    }
}
