use crate::settings::{CUSTOM_PERSONALITY_LABEL, MODELS, PERSONALITIES};
use crate::ui::ChatHandle;
use dioxus::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Panel {
    Models,
    Personality,
    Menu,
    ConfirmClear,
}

const CLEAR_CONFIRM_PROMPT: &str = "Delete the whole conversation? This cannot be undone.";

fn option_class(active: bool) -> &'static str {
    if active { "option active" } else { "option" }
}

/// Top bar: model and personality pickers plus the chat menu.
#[component]
pub fn ChatHeader(input: Signal<String>) -> Element {
    let handle = use_context::<ChatHandle>();
    let mut open_panel = use_signal(|| Option::<Panel>::None);
    let prefs = handle.session.read().prefs().clone();

    let mut toggle = move |panel: Panel| {
        let next = if open_panel() == Some(panel) { None } else { Some(panel) };
        open_panel.set(next);
    };

    rsx! {
        div { class: "header no-divider",
            div { class: "header-content",
                h1 { class: "wordmark", "Calavera AI" }
                div { class: "header-actions",
                    button {
                        class: "chip",
                        r#type: "button",
                        title: "Choose model",
                        onclick: move |_| toggle(Panel::Models),
                        i { class: "fas fa-microchip" }
                        " {prefs.model_label}"
                    }
                    button {
                        class: "chip",
                        r#type: "button",
                        title: "Choose personality",
                        onclick: move |_| toggle(Panel::Personality),
                        i { class: "fas fa-masks-theater" }
                        " {prefs.personality_label}"
                    }
                    button {
                        class: "icon-btn",
                        r#type: "button",
                        title: "Menu",
                        onclick: move |_| toggle(Panel::Menu),
                        i { class: "fas fa-ellipsis-v" }
                    }
                }
            }
            {match open_panel() {
                Some(Panel::Models) => rsx! { ModelPicker { open_panel, input } },
                Some(Panel::Personality) => rsx! { PersonalityPicker { open_panel } },
                Some(Panel::Menu) => rsx! { ChatMenu { open_panel } },
                Some(Panel::ConfirmClear) => rsx! { ConfirmClear { open_panel } },
                None => rsx! {},
            }}
        }
    }
}

#[component]
fn ModelPicker(open_panel: Signal<Option<Panel>>, input: Signal<String>) -> Element {
    let handle = use_context::<ChatHandle>();
    let mut open_panel = open_panel;
    let current = handle.session.read().prefs().model.clone();

    rsx! {
        div { class: "modal-backdrop", onclick: move |_| open_panel.set(None),
            div { class: "modal", onclick: move |ev| ev.stop_propagation(),
                h3 { class: "section-title", "Choose a model" }
                for model in MODELS.iter().copied() {
                    button {
                        key: "{model.id}",
                        class: option_class(model.id == current),
                        r#type: "button",
                        onclick: move |_| {
                            let unsent = input.peek().clone();
                            handle.update(|session| session.select_model(model.id, &unsent));
                            open_panel.set(None);
                        },
                        div { class: "option-title",
                            "{model.label}"
                            if !model.supports_images {
                                span { class: "tag-pill tag-pill-compact", "Text only" }
                            }
                        }
                        div { class: "option-description", "{model.description}" }
                    }
                }
            }
        }
    }
}

#[component]
fn PersonalityPicker(open_panel: Signal<Option<Panel>>) -> Element {
    let handle = use_context::<ChatHandle>();
    let mut open_panel = open_panel;
    let prefs = handle.session.read().prefs().clone();
    let mut custom_text = use_signal(|| {
        if prefs.is_custom_personality() {
            prefs.personality.clone()
        } else {
            String::new()
        }
    });

    rsx! {
        div { class: "modal-backdrop", onclick: move |_| open_panel.set(None),
            div { class: "modal", onclick: move |ev| ev.stop_propagation(),
                h3 { class: "section-title", "Personality" }
                for option in PERSONALITIES.iter().copied() {
                    button {
                        key: "{option.label}",
                        class: option_class(option.label == prefs.personality_label),
                        r#type: "button",
                        onclick: move |_| {
                            handle.update(|session| session.select_personality(option.value, option.label));
                            open_panel.set(None);
                        },
                        div { class: "option-title", "{option.label}" }
                    }
                }
                div { class: "custom-personality",
                    div { class: "option-title", "{CUSTOM_PERSONALITY_LABEL}" }
                    textarea {
                        rows: "3",
                        placeholder: "Describe how Calavera should talk...",
                        value: "{custom_text}",
                        oninput: move |ev| custom_text.set(ev.value()),
                    }
                    button {
                        class: "btn btn-primary",
                        r#type: "button",
                        onclick: move |_| {
                            let text = custom_text.peek().clone();
                            let applied = handle.update(|session| {
                                session.select_personality(&text, CUSTOM_PERSONALITY_LABEL)
                            });
                            if applied {
                                open_panel.set(None);
                            }
                        },
                        "Apply"
                    }
                }
            }
        }
    }
}

#[component]
fn ChatMenu(open_panel: Signal<Option<Panel>>) -> Element {
    let handle = use_context::<ChatHandle>();
    let mut open_panel = open_panel;
    let auto_clear = handle.session.read().prefs().auto_clear;

    rsx! {
        div { class: "dropdown-menu",
            button {
                class: "menu-item danger",
                r#type: "button",
                onclick: move |_| open_panel.set(Some(Panel::ConfirmClear)),
                i { class: "fas fa-trash" }
                " Clear chat"
            }
            label { class: "menu-item toggle",
                input {
                    r#type: "checkbox",
                    checked: auto_clear,
                    onchange: move |_| {
                        handle.update(|session| session.set_auto_clear(!auto_clear));
                    },
                }
                " Clear history at midnight"
            }
        }
    }
}

#[component]
fn ConfirmClear(open_panel: Signal<Option<Panel>>) -> Element {
    let handle = use_context::<ChatHandle>();
    let mut open_panel = open_panel;

    rsx! {
        div { class: "modal-backdrop", onclick: move |_| open_panel.set(None),
            div {
                class: "modal confirm",
                role: "alertdialog",
                onclick: move |ev| ev.stop_propagation(),
                h3 { class: "section-title", "Clear chat" }
                p { class: "text-muted", "{CLEAR_CONFIRM_PROMPT}" }
                div { class: "confirm-actions",
                    button {
                        class: "btn",
                        r#type: "button",
                        onclick: move |_| open_panel.set(None),
                        "Cancel"
                    }
                    button {
                        class: "btn btn-danger",
                        r#type: "button",
                        onclick: move |_| {
                            handle.clear_all();
                            open_panel.set(None);
                        },
                        "Clear"
                    }
                }
            }
        }
    }
}
