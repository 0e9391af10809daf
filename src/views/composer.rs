use crate::attachment::{PickedFile, StagedAttachment};
use crate::lightbox::LightboxImage;
use crate::session::MAX_INPUT_CHARS;
use crate::ui::ChatHandle;
use crate::views::chat::FileCard;
use crate::views::lightbox::open_single;
use dioxus::events::{FormEvent, Key, Modifiers};
use dioxus::prelude::*;
use std::path::Path;

const DOCUMENT_ACCEPT: &str = ".pdf,.doc,.docx,.txt";

/// Reads the first picked file of a file input.
async fn read_picked_file(ev: &FormEvent) -> Option<PickedFile> {
    let engine = ev.files()?;
    let path = engine.files().into_iter().next()?;
    let name = Path::new(&path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());
    match engine.read_file(&path).await {
        Some(bytes) => Some(PickedFile::new(name, bytes)),
        None => {
            tracing::warn!(%path, "picked file could not be read");
            None
        }
    }
}

#[component]
pub fn Composer(input: Signal<String>) -> Element {
    let mut input = input;
    let handle = use_context::<ChatHandle>();
    let session = handle.session.read();
    let busy = session.is_busy();
    let can_send = session.can_send(&input.read());
    let search_on = session.search_mode();
    let search_available = session.search_available();
    let staged = session.attachment().cloned();
    drop(session);

    let length = input.read().chars().count();
    let counter_class = if length > MAX_INPUT_CHARS { "char-counter over" } else { "char-counter" };
    let search_class = if search_on { "tool-btn active" } else { "tool-btn" };
    let placeholder = if search_on {
        "Search for anything..."
    } else {
        "Message Calavera AI..."
    };

    let mut submit = move || {
        let text = input.peek().clone();
        if handle.send(&text) {
            input.set(String::new());
        }
    };

    rsx! {
        form { class: "composer no-divider", onsubmit: move |ev| ev.prevent_default(),
            if let Some(staged) = staged {
                AttachmentPreview { staged }
            }
            div { class: "composer-inner",
                div { class: "composer-tools",
                    label { class: "tool-btn", title: "Attach image",
                        i { class: "fas fa-image" }
                        input {
                            r#type: "file",
                            accept: "image/*",
                            class: "hidden-input",
                            disabled: busy,
                            onchange: move |ev: FormEvent| async move {
                                if let Some(file) = read_picked_file(&ev).await {
                                    handle.update(|session| session.stage_image(file));
                                }
                            },
                        }
                    }
                    label { class: "tool-btn camera-btn", title: "Take a photo",
                        i { class: "fas fa-camera" }
                        input {
                            r#type: "file",
                            accept: "image/*",
                            "capture": "environment",
                            class: "hidden-input",
                            disabled: busy,
                            onchange: move |ev: FormEvent| async move {
                                if let Some(file) = read_picked_file(&ev).await {
                                    handle.update(|session| session.stage_image(file));
                                }
                            },
                        }
                    }
                    label { class: "tool-btn", title: "Attach document",
                        i { class: "fas fa-paperclip" }
                        input {
                            r#type: "file",
                            accept: DOCUMENT_ACCEPT,
                            class: "hidden-input",
                            disabled: busy,
                            onchange: move |ev: FormEvent| async move {
                                if let Some(file) = read_picked_file(&ev).await {
                                    handle.update(|session| session.stage_document(file));
                                }
                            },
                        }
                    }
                    button {
                        class: search_class,
                        r#type: "button",
                        title: "Search the web",
                        disabled: !search_available,
                        onclick: move |_| {
                            handle.update(|session| session.toggle_search_mode());
                        },
                        i { class: "fas fa-globe" }
                    }
                }
                textarea {
                    rows: "1",
                    placeholder,
                    value: "{input}",
                    oninput: move |ev| input.set(ev.value()),
                    onkeydown: move |ev| {
                        if ev.key() == Key::Enter && !ev.modifiers().contains(Modifiers::SHIFT) {
                            ev.prevent_default();
                            submit();
                        }
                    },
                    autofocus: true,
                }
                span { class: counter_class, "{length}/{MAX_INPUT_CHARS}" }
                if busy {
                    button {
                        class: "btn btn-stop",
                        r#type: "button",
                        title: "Stop response",
                        onclick: move |_| handle.stop(),
                        i { class: "fas fa-stop" }
                    }
                } else {
                    button {
                        class: "btn btn-primary",
                        r#type: "button",
                        title: "Send",
                        disabled: !can_send,
                        onclick: move |_| submit(),
                        i { class: "fas fa-paper-plane" }
                    }
                }
            }
        }
    }
}

#[component]
fn AttachmentPreview(staged: StagedAttachment) -> Element {
    let handle = use_context::<ChatHandle>();
    let remove = move |_: MouseEvent| {
        handle.update(|session| session.remove_attachment());
    };

    rsx! {
        div { class: "attachment-preview",
            {match staged {
                StagedAttachment::Image { data_url, .. } => {
                    let preview = data_url.clone();
                    rsx! {
                        img {
                            class: "preview-image",
                            src: "{data_url}",
                            alt: "Image preview",
                            onclick: move |_| {
                                open_single(handle.lightbox, LightboxImage::new(preview.clone(), "Image preview"));
                            },
                        }
                    }
                }
                StagedAttachment::Document { file } => rsx! {
                    FileCard { info: file.file_info() }
                },
            }}
            button {
                class: "remove-attachment",
                r#type: "button",
                title: "Remove attachment",
                onclick: remove,
                i { class: "fas fa-times" }
            }
        }
    }
}
