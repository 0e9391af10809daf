use crate::lightbox::{
    CLOSE_DELAY, Lightbox, LightboxImage, LightboxKey, LightboxPhase, Navigation, OPEN_DELAY, Point,
    Rect,
};
use crate::ui::ChatHandle;
use dioxus::events::TouchPoint;
use dioxus::prelude::*;
use std::rc::Rc;
use std::time::Instant;

fn start_opening(mut lightbox: Signal<Lightbox>) {
    spawn_forever(async move {
        tokio::time::sleep(OPEN_DELAY).await;
        lightbox.write().finish_opening();
    });
}

/// Opens the gallery on image `index` of `images`.
pub fn open_gallery(mut lightbox: Signal<Lightbox>, images: Vec<LightboxImage>, index: usize) {
    if lightbox.write().open_gallery(images, index) {
        start_opening(lightbox);
    }
}

/// Shows one image outside the gallery, e.g. a staged attachment.
pub fn open_single(mut lightbox: Signal<Lightbox>, image: LightboxImage) {
    if lightbox.write().open_single(image) {
        start_opening(lightbox);
    }
}

pub fn close_lightbox(mut lightbox: Signal<Lightbox>) {
    if lightbox.write().close() {
        spawn_forever(async move {
            tokio::time::sleep(CLOSE_DELAY).await;
            lightbox.write().finish_closing();
        });
    }
}

fn touch_points(touches: &[TouchPoint]) -> Vec<Point> {
    touches
        .iter()
        .map(|touch| {
            let p = touch.client_coordinates();
            Point::new(p.x, p.y)
        })
        .collect()
}

async fn element_rect(element: Option<Rc<MountedData>>) -> Option<Rect> {
    let rect = element?.get_client_rect().await.ok()?;
    Some(Rect {
        x: rect.origin.x,
        y: rect.origin.y,
        width: rect.size.width,
        height: rect.size.height,
    })
}

#[component]
pub fn LightboxView() -> Element {
    let handle = use_context::<ChatHandle>();
    let mut lightbox = handle.lightbox;
    let mut image_element = use_signal(|| Option::<Rc<MountedData>>::None);
    let mut image_rect = use_signal(Rect::default);

    let state = lightbox.read();
    if !state.is_visible() {
        return rsx! {};
    }
    let phase_class = match state.phase() {
        LightboxPhase::Open => "lightbox active",
        LightboxPhase::Closing => "lightbox closing",
        _ => "lightbox",
    };
    let slide_class = match state.last_navigation() {
        Some(Navigation::Next) => "lightbox-image slide-next",
        Some(Navigation::Prev) => "lightbox-image slide-prev",
        None => "lightbox-image",
    };
    let (src, caption) = state
        .current()
        .map(|image| (image.src.clone(), image.caption.clone()))
        .unwrap_or_default();
    let index = state.index();
    let (position, total) = state.counter();
    let show_navigation = state.show_navigation();
    let zoom_label = state.zoom_label();
    let can_zoom_in = state.can_zoom_in();
    let can_zoom_out = state.can_zoom_out();
    let image_style = format!(
        "transform: {}; cursor: {};",
        state.transform_css(),
        state.cursor()
    );
    drop(state);

    let refresh_rect = move || {
        spawn(async move {
            if let Some(rect) = element_rect(image_element()).await {
                image_rect.set(rect);
            }
        });
    };

    rsx! {
        div {
            class: phase_class,
            tabindex: "0",
            role: "dialog",
            aria_modal: "true",
            onmounted: move |ev| async move {
                let _ = ev.set_focus(true).await;
            },
            onclick: move |_| close_lightbox(lightbox),
            onkeydown: move |ev| {
                let Some(key) = LightboxKey::from_key(&ev.key().to_string()) else {
                    return;
                };
                ev.prevent_default();
                if key == LightboxKey::Close {
                    close_lightbox(lightbox);
                } else {
                    lightbox.write().key(key);
                }
            },
            onwheel: move |ev| {
                ev.prevent_default();
                lightbox.write().wheel(ev.delta().strip_units().y);
            },
            button {
                class: "lightbox-close",
                r#type: "button",
                aria_label: "Close",
                onclick: move |ev| {
                    ev.stop_propagation();
                    close_lightbox(lightbox);
                },
                i { class: "fas fa-times" }
            }
            if show_navigation {
                button {
                    class: "lightbox-nav prev",
                    r#type: "button",
                    aria_label: "Previous image",
                    onclick: move |ev| {
                        ev.stop_propagation();
                        lightbox.write().prev();
                    },
                    i { class: "fas fa-chevron-left" }
                }
                button {
                    class: "lightbox-nav next",
                    r#type: "button",
                    aria_label: "Next image",
                    onclick: move |ev| {
                        ev.stop_propagation();
                        lightbox.write().next();
                    },
                    i { class: "fas fa-chevron-right" }
                }
            }
            div { class: "lightbox-stage", onclick: move |ev| ev.stop_propagation(),
                img {
                    key: "{index}",
                    class: slide_class,
                    src: "{src}",
                    alt: "{caption}",
                    style: "{image_style}",
                    draggable: "false",
                    onmounted: move |ev| {
                        image_element.set(Some(ev.data()));
                        refresh_rect();
                    },
                    onload: move |_| refresh_rect(),
                    ondoubleclick: move |ev| {
                        let p = ev.client_coordinates();
                        lightbox.write().toggle_zoom_at(Point::new(p.x, p.y), image_rect());
                    },
                    onmousedown: move |ev| {
                        let p = ev.client_coordinates();
                        if lightbox.write().pointer_down(Point::new(p.x, p.y)) {
                            ev.prevent_default();
                        }
                    },
                    onmousemove: move |ev| {
                        if lightbox.peek().is_dragging() {
                            let p = ev.client_coordinates();
                            lightbox.write().pointer_move(Point::new(p.x, p.y));
                        }
                    },
                    onmouseup: move |_| lightbox.write().pointer_up(),
                    onmouseleave: move |_| lightbox.write().pointer_up(),
                    ontouchstart: move |ev| {
                        let touches = touch_points(&ev.touches());
                        if lightbox.write().touch_start(&touches, image_rect(), Instant::now()) {
                            ev.prevent_default();
                        }
                    },
                    ontouchmove: move |ev| {
                        ev.prevent_default();
                        let touches = touch_points(&ev.touches());
                        lightbox.write().touch_move(&touches);
                    },
                    ontouchend: move |ev| {
                        let remaining = ev.touches().len();
                        let lifted = touch_points(&ev.touches_changed()).first().copied();
                        lightbox.write().touch_end(remaining, lifted);
                    },
                }
            }
            div { class: "lightbox-toolbar", onclick: move |ev| ev.stop_propagation(),
                button {
                    class: "icon-btn",
                    r#type: "button",
                    aria_label: "Zoom out",
                    disabled: !can_zoom_out,
                    onclick: move |_| lightbox.write().zoom_out(),
                    i { class: "fas fa-search-minus" }
                }
                span { class: "zoom-label", "{zoom_label}" }
                button {
                    class: "icon-btn",
                    r#type: "button",
                    aria_label: "Zoom in",
                    disabled: !can_zoom_in,
                    onclick: move |_| lightbox.write().zoom_in(),
                    i { class: "fas fa-search-plus" }
                }
                button {
                    class: "icon-btn",
                    r#type: "button",
                    aria_label: "Reset zoom",
                    onclick: move |_| lightbox.write().reset_zoom(),
                    i { class: "fas fa-compress" }
                }
                if show_navigation {
                    span { class: "lightbox-counter", "{position} / {total}" }
                }
            }
            if !caption.is_empty() {
                div { class: "lightbox-caption", "{caption}" }
            }
        }
    }
}
