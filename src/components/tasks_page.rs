//! Tasks Page Component
//!
//! Task list with search by title or assignee, completion toggle and
//! soft delete. Open tasks past their due date are highlighted.

use chrono::Local;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;
use crate::components::DeleteConfirmButton;
use crate::context::use_app_context;
use crate::directory::{filter_tasks, user_name};
use crate::error::require;
use crate::funnel::{format_date, is_overdue};
use crate::models::{non_empty, NewTask, Task};
use crate::store::{store_add_task, store_remove_task, store_update_task, use_app_store, AppStateStoreFields};

#[component]
pub fn TasksPage() -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let (query, set_query) = signal(String::new());
    let (show_form, set_show_form) = signal(false);

    let api = ctx.api();
    spawn_local(async move {
        match api::list_tasks(&api).await {
            Ok(tasks) => app_store.tasks().set(tasks),
            Err(err) => ctx.notify_error(format!("Не удалось загрузить задачи: {}", err.user_message())),
        }
    });

    let visible = move || {
        let query = query.get();
        app_store.users().with(|users| {
            app_store
                .tasks()
                .with(|tasks| filter_tasks(tasks, users, &query).into_iter().cloned().collect::<Vec<_>>())
        })
    };

    view! {
        <div class="entity-page">
            <div class="entity-toolbar">
                <h2>"Задачи"</h2>
                <input
                    type="search"
                    class="entity-search"
                    placeholder="Поиск по названию или исполнителю"
                    prop:value=move || query.get()
                    on:input=move |ev| set_query.set(event_target_value(&ev))
                />
                <button class="primary-btn" on:click=move |_| set_show_form.update(|v| *v = !*v)>
                    "+ Задача"
                </button>
            </div>

            <Show when=move || show_form.get()>
                <TaskForm on_done=move |_| set_show_form.set(false) />
            </Show>

            <ul class="task-list">
                <For
                    each=visible
                    // Rows re-render when completion flips
                    key=|task| (task.task_id, task.is_completed)
                    children=move |task| view! { <TaskRow task=task /> }
                />
            </ul>
        </div>
    }
}

#[component]
fn TaskRow(task: Task) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();
    let task_id = task.task_id;
    let completed = task.is_completed;

    let overdue = !completed && task.due_date.as_deref().is_some_and(|due| is_overdue(due, Local::now().date_naive()));
    let assignee = app_store.users().with(|users| user_name(users, task.assigned_to));

    let toggle = move |_| {
        let api = ctx.api();
        spawn_local(async move {
            match api::set_task_completed(&api, task_id, !completed).await {
                Ok(updated) => store_update_task(&app_store, updated),
                Err(err) => ctx.notify_error(format!("Не удалось обновить задачу: {}", err.user_message())),
            }
        });
    };

    let delete = move |_| {
        let api = ctx.api();
        spawn_local(async move {
            match api::soft_delete_task(&api, task_id).await {
                Ok(()) => store_remove_task(&app_store, task_id),
                Err(err) => ctx.notify_error(format!("Не удалось удалить задачу: {}", err.user_message())),
            }
        });
    };

    let class = match (completed, overdue) {
        (true, _) => "task-row completed",
        (false, true) => "task-row overdue",
        (false, false) => "task-row",
    };

    view! {
        <li class=class>
            <input type="checkbox" prop:checked=completed on:change=toggle />
            <div class="task-body">
                <div class="task-title">{task.title}</div>
                {task.description.map(|text| view! { <div class="task-description">{text}</div> })}
            </div>
            <span class="task-assignee">{assignee}</span>
            <span class="task-due">{task.due_date.as_deref().map(format_date).unwrap_or_default()}</span>
            <DeleteConfirmButton button_class="row-delete-btn" on_confirm=delete />
        </li>
    }
}

#[component]
fn TaskForm(#[prop(into)] on_done: Callback<()>) -> impl IntoView {
    let ctx = use_app_context();
    let app_store = use_app_store();

    let form = RwSignal::new(NewTask { title: String::new(), description: None, due_date: None, assigned_to: None });
    let (message, set_message) = signal(None::<String>);

    let submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let mut task = form.get_untracked();
        if let Err(err) = require("Название", &task.title) {
            set_message.set(Some(err.to_string()));
            return;
        }
        task.title = task.title.trim().to_string();
        if task.assigned_to.is_none() {
            task.assigned_to = ctx.viewer().map(|claims| claims.sub);
        }

        let api = ctx.api();
        spawn_local(async move {
            match api::create_task(&api, &task).await {
                Ok(created) => {
                    store_add_task(&app_store, created);
                    on_done.run(());
                }
                Err(err) => {
                    let _ = set_message.try_set(Some(err.user_message()));
                }
            }
        });
    };

    view! {
        <form class="entity-form" on:submit=submit>
            {move || message.get().map(|text| view! { <div class="form-error">{text}</div> })}
            <input
                type="text"
                placeholder="Название"
                prop:value=move || form.with(|f| f.title.clone())
                on:input=move |ev| form.update(|f| f.title = event_target_value(&ev))
            />
            <input
                type="text"
                placeholder="Описание"
                on:input=move |ev| form.update(|f| f.description = non_empty(&event_target_value(&ev)))
            />
            <input
                type="date"
                on:input=move |ev| form.update(|f| f.due_date = non_empty(&event_target_value(&ev)))
            />
            <select on:change=move |ev| form.update(|f| f.assigned_to = event_target_value(&ev).parse().ok())>
                <option value="">"Мне"</option>
                <For
                    each=move || app_store.users().get()
                    key=|user| user.user_id
                    children=move |user| {
                        view! { <option value=user.user_id.to_string()>{user.display_name()}</option> }
                    }
                />
            </select>
            <button type="submit" class="primary-btn">"Создать"</button>
        </form>
    }
}
