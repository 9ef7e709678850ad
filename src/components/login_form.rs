//! Login / Registration Component
//!
//! Shown while signed out. Field checks run before any request; backend
//! messages are shown above the form.

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::context::use_app_context;
use crate::session::{self, Credentials, Registration};

#[component]
pub fn LoginPage() -> impl IntoView {
    let (registering, set_registering) = signal(false);

    view! {
        <div class="auth-page">
            <div class="auth-card">
                <h2>{move || if registering.get() { "Регистрация" } else { "Вход" }}</h2>
                <Show
                    when=move || registering.get()
                    fallback=move || view! { <LoginForm on_switch=move |_| set_registering.set(true) /> }
                >
                    <RegisterForm on_done=move |_| set_registering.set(false) />
                </Show>
            </div>
        </div>
    }
}

#[component]
fn LoginForm(#[prop(into)] on_switch: Callback<()>) -> impl IntoView {
    let ctx = use_app_context();
    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (message, set_message) = signal(None::<String>);
    let (submitting, set_submitting) = signal(false);

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let credentials = Credentials { email: email.get_untracked(), password: password.get_untracked() };
        if let Err(err) = credentials.validate() {
            set_message.set(Some(err.user_message()));
            return;
        }
        set_message.set(None);
        set_submitting.set(true);

        let api = ctx.api();
        spawn_local(async move {
            match session::login(&api, &credentials).await {
                Ok(claims) => ctx.sign_in(claims),
                Err(err) => {
                    let _ = set_message.try_set(Some(err.user_message()));
                }
            }
            let _ = set_submitting.try_set(false);
        });
    };

    view! {
        <form class="auth-form" on:submit=submit>
            {move || message.get().map(|text| view! { <div class="form-error">{text}</div> })}
            <label>
                "Email"
                <input
                    type="email"
                    prop:value=move || email.get()
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                />
            </label>
            <label>
                "Пароль"
                <input
                    type="password"
                    prop:value=move || password.get()
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                />
            </label>
            <button type="submit" class="primary-btn" disabled=move || submitting.get()>"Войти"</button>
            <button type="button" class="link-btn" on:click=move |_| on_switch.run(())>
                "Нет аккаунта? Зарегистрироваться"
            </button>
        </form>
    }
}

#[component]
fn RegisterForm(#[prop(into)] on_done: Callback<()>) -> impl IntoView {
    let ctx = use_app_context();
    let form = RwSignal::new(Registration::default());
    let (message, set_message) = signal(None::<String>);

    let field = move |label: &'static str, kind: &'static str, get: fn(&Registration) -> String, set: fn(&mut Registration, String)| {
        view! {
            <label>
                {label}
                <input
                    type=kind
                    prop:value=move || form.with(get)
                    on:input=move |ev| form.update(|f| set(f, event_target_value(&ev)))
                />
            </label>
        }
    };

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let registration = form.get_untracked();
        if let Err(err) = registration.validate() {
            set_message.set(Some(err.user_message()));
            return;
        }
        set_message.set(None);

        let api = ctx.api();
        spawn_local(async move {
            match session::register(&api, &registration).await {
                Ok(_) => {
                    ctx.notify_info("Регистрация прошла успешно, войдите");
                    on_done.run(());
                }
                Err(err) => {
                    let _ = set_message.try_set(Some(err.user_message()));
                }
            }
        });
    };

    view! {
        <form class="auth-form" on:submit=submit>
            {move || message.get().map(|text| view! { <div class="form-error">{text}</div> })}
            {field("Имя пользователя", "text", |f| f.username.clone(), |f, v| f.username = v)}
            {field("Email", "email", |f| f.email.clone(), |f, v| f.email = v)}
            {field("Пароль", "password", |f| f.password.clone(), |f, v| f.password = v)}
            {field("Имя", "text", |f| f.first_name.clone(), |f, v| f.first_name = v)}
            {field("Фамилия", "text", |f| f.last_name.clone(), |f, v| f.last_name = v)}
            <button type="submit" class="primary-btn">"Зарегистрироваться"</button>
            <button type="button" class="link-btn" on:click=move |_| on_done.run(())>
                "Уже есть аккаунт? Войти"
            </button>
        </form>
    }
}
