use leptos::prelude::*;

use netscope::event::UpdateEvent;
use netscope::inspector::Trigger;
use netscope::receptive_field::ExecutionTier;
use netscope::view::{NetworkView, ViewConfig};

use crate::ui_model::{socket_io_url, ConnectionState, DEFAULT_SERVER_URL};

mod canvas;
mod socket;

use canvas::{clear_canvas, paint_scene};
use socket::{console_warn, UpdateSocket};

pub fn start() {
    mount_to_body(|| view! { <App /> });
}

#[component]
fn App() -> impl IntoView {
    let view_store = StoredValue::new(NetworkView::new(
        ViewConfig::default().with_tier(ExecutionTier::auto()),
    ));
    let socket = StoredValue::new_local(None::<UpdateSocket>);

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let swatch_ref = NodeRef::<leptos::html::Canvas>::new();

    let (server_url, set_server_url) = signal(DEFAULT_SERVER_URL.to_string());
    let (conn, set_conn) = signal(ConnectionState::Disconnected);
    let (draw_weights, set_draw_weights) = signal(true);
    let (trigger, set_trigger) = signal(Trigger::Hover);
    let (status_lines, set_status_lines) = signal(Vec::<String>::new());
    let (overlay_label, set_overlay_label) = signal::<Option<String>>(None);
    let (notice, set_notice) = signal(String::new());

    // Push core state into the page. `repaint` is set when the scene itself
    // changed; overlay changes only touch the swatch.
    let sync_ui = move |repaint: bool| {
        view_store.with_value(|v| {
            if repaint {
                if let Some(canvas) = canvas_ref.get_untracked() {
                    if let Err(e) = paint_scene(&canvas, v.scene()) {
                        console_warn(&e);
                    }
                }
            }

            if let Some(swatch) = swatch_ref.get_untracked() {
                let painted = match v.overlay() {
                    Some(overlay) => paint_scene(&swatch, overlay.swatch()),
                    None => clear_canvas(&swatch),
                };
                if let Err(e) = painted {
                    console_warn(&e);
                }
            }

            set_status_lines.set(v.status().lines());
            set_overlay_label.set(v.overlay().map(|o| o.label().to_string()));
        });
    };

    let on_update = move |data: serde_json::Value| match UpdateEvent::from_value(data) {
        Ok(event) => {
            let mut redrawn = false;
            view_store.update_value(|v| redrawn = v.apply_update(event));
            sync_ui(redrawn);
        }
        Err(e) => console_warn(&e.to_string()),
    };

    let do_disconnect = move || {
        let mut taken = None;
        socket.update_value(|s| taken = s.take());
        if let Some(s) = taken {
            s.disconnect();
        }
        set_conn.set(ConnectionState::Disconnected);
    };

    let do_connect = move || {
        do_disconnect();
        let Some(url) = socket_io_url(&server_url.get_untracked()) else {
            set_notice.set("enter a server URL".to_string());
            return;
        };
        set_conn.set(ConnectionState::Connecting);
        match UpdateSocket::connect(&url, on_update, move |state| set_conn.set(state)) {
            Ok(s) => {
                socket.set_value(Some(s));
                set_notice.set(format!("listening on {url}"));
            }
            Err(e) => {
                set_conn.set(ConnectionState::Failed);
                set_notice.set(e);
            }
        }
    };

    on_cleanup(move || do_disconnect());

    let on_draw_weights = move |on: bool| {
        set_draw_weights.set(on);
        view_store.update_value(|v| v.set_draw_weights(on));
        sync_ui(true);
    };

    let on_trigger = move |t: Trigger| {
        set_trigger.set(t);
        let mut changed = false;
        view_store.update_value(|v| changed = v.set_trigger(t));
        if changed {
            sync_ui(false);
        }
    };

    let on_pointer = move |f: &dyn Fn(&mut NetworkView) -> bool| {
        let mut changed = false;
        view_store.update_value(|v| changed = f(v));
        if changed {
            sync_ui(false);
        }
    };

    view! {
        <main style="font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; padding: 18px;">
            <h1 style="margin: 0 0 8px 0;">"netscope"</h1>
            <p style="margin: 0 0 16px 0; color: #555;">
                "Live network weights with per-neuron receptive fields."
            </p>

            <section style="display: flex; gap: 10px; flex-wrap: wrap; margin-bottom: 14px; align-items: center;">
                <label style="display: flex; gap: 8px; align-items: center;">
                    <span style="color: #333;">"Server"</span>
                    <input
                        type="text"
                        size="36"
                        prop:value=move || server_url.get()
                        on:input=move |ev| set_server_url.set(event_target_value(&ev))
                    />
                </label>
                <button
                    prop:disabled=move || conn.get().is_active()
                    on:click=move |_| do_connect()
                >
                    "Connect"
                </button>
                <button
                    prop:disabled=move || !conn.get().is_active()
                    on:click=move |_| do_disconnect()
                >
                    "Disconnect"
                </button>
                <span style="color: #777;">{move || conn.get().label()}</span>
            </section>

            <section style="display: flex; gap: 16px; flex-wrap: wrap; margin-bottom: 14px; align-items: center;">
                <label style="display: flex; gap: 8px; align-items: center;">
                    <input
                        type="checkbox"
                        prop:checked=move || draw_weights.get()
                        on:change=move |ev| on_draw_weights(event_target_checked(&ev))
                    />
                    <span>"Draw weights"</span>
                </label>

                <label style="display: flex; gap: 8px; align-items: center;">
                    <span style="color: #333;">"Inspect on"</span>
                    <select
                        prop:value=move || trigger.get().label().to_string()
                        on:change=move |ev| {
                            if let Some(t) = Trigger::parse(&event_target_value(&ev)) {
                                on_trigger(t);
                            }
                        }
                    >
                        {Trigger::all()
                            .iter()
                            .map(|t| view! { <option value=t.label()>{t.label()}</option> })
                            .collect_view()}
                    </select>
                </label>
            </section>

            <section style="margin-bottom: 14px; color: #333;">
                <For
                    each=move || status_lines.get()
                    key=|line| line.clone()
                    children=move |line| view! { <div>{line}</div> }
                />
                <div style="color: #777;">{move || notice.get()}</div>
                <div style="font-weight: 600;">{move || overlay_label.get().unwrap_or_default()}</div>
            </section>

            <canvas
                node_ref=canvas_ref
                style="border: 1px solid #eee;"
                on:mousemove=move |ev| {
                    let (x, y) = (ev.offset_x() as f64, ev.offset_y() as f64);
                    on_pointer(&move |v| v.pointer_move(x, y));
                }
                on:mouseleave=move |_| on_pointer(&|v| v.pointer_leave())
                on:click=move |ev| {
                    let (x, y) = (ev.offset_x() as f64, ev.offset_y() as f64);
                    on_pointer(&move |v| v.pointer_click(x, y));
                }
            />

            <div style=move || format!(
                "position: fixed; top: 20px; right: 20px; background: #fff; padding: 10px; border: 1px solid #ccc; border-radius: 8px; display: {};",
                if overlay_label.get().is_some() { "block" } else { "none" },
            )>
                <canvas node_ref=swatch_ref />
                <div style="text-align: center; margin-top: 6px;">
                    {move || overlay_label.get().unwrap_or_default()}
                </div>
            </div>
        </main>
    }
}
