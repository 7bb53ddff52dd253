//! Conversation engine.
//!
//! One call to [`Engine::handle`] is one conversation turn: it takes the
//! user's session, one inbound event, mutates the store and session, calls
//! the outbound seams, and returns a single [`Render`] describing the
//! reply. The engine holds no per-user state of its own, so one instance
//! serves every session concurrently.
//!
//! Ordering rule for answers: the channel publish happens first and the
//! store write second. A failed publish therefore leaves the question
//! untouched and retryable, while a failed store write after a successful
//! publish is logged loudly rather than rolled back off the channel.

pub mod event;
pub mod render;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::{CoreError, CoreResult};
use crate::rules::{self, AdminRoster, DetailedStats};
use crate::session::{Browse, ListFilter, Session, SessionState};
use crate::store::{Category, Question, QuestionPatch, QuestionStore, Status};
use crate::text;
use chrono::Utc;
use event::{Action, Command, Inbound};
use render::{Render, RenderOption};
use traits::{ChannelPublisher, UserNotifier};

/// Admin list views show this many questions per page.
pub const PAGE_SIZE: usize = 5;

pub struct Engine<P, N> {
    store: QuestionStore,
    admins: AdminRoster,
    channel_url: Option<String>,
    publisher: P,
    notifier: N,
}

impl<P: ChannelPublisher, N: UserNotifier> Engine<P, N> {
    pub fn new(
        store: QuestionStore,
        admins: AdminRoster,
        channel_url: Option<String>,
        publisher: P,
        notifier: N,
    ) -> Self {
        Self {
            store,
            admins,
            channel_url,
            publisher,
            notifier,
        }
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    /// Run one conversation turn.
    pub async fn handle(
        &self,
        session: &mut Session,
        user_id: i64,
        input: Inbound,
    ) -> CoreResult<Render> {
        match input {
            Inbound::Command(command) => self.handle_command(session, user_id, command),
            Inbound::Text(text) => self.handle_text(session, user_id, text).await,
            Inbound::Button(action) => self.handle_button(session, user_id, action).await,
        }
    }

    fn handle_command(
        &self,
        session: &mut Session,
        user_id: i64,
        command: Command,
    ) -> CoreResult<Render> {
        match command {
            Command::Start => {
                session.reset();
                Ok(self.main_menu(text::WELCOME))
            }
            Command::Help => Ok(Render::text(text::HELP)),
            Command::Cancel => {
                if session.state == SessionState::Idle && session.browse.is_none() {
                    Ok(self.main_menu(text::NOTHING_TO_CANCEL))
                } else {
                    session.reset();
                    Ok(self.main_menu(text::CANCELLED))
                }
            }
            Command::Admin => {
                self.admins.authorize(user_id)?;
                session.reset();
                Ok(self.admin_menu())
            }
            Command::Stats => Ok(self.stats_view(user_id)),
        }
    }

    async fn handle_text(
        &self,
        session: &mut Session,
        user_id: i64,
        raw: String,
    ) -> CoreResult<Render> {
        let trimmed = raw.trim();

        match session.state.clone() {
            SessionState::AwaitingQuestionText { category } => {
                if trimmed.is_empty() {
                    return Ok(Render::text(text::EMPTY_TEXT));
                }
                self.submit_question(session, user_id, category, trimmed).await
            }
            SessionState::Answering { question_id } => {
                if trimmed.is_empty() {
                    return Ok(Render::text(text::EMPTY_TEXT));
                }
                self.submit_answer(session, user_id, &question_id, trimmed).await
            }
            SessionState::Editing { question_id } => {
                if trimmed.is_empty() {
                    return Ok(Render::text(text::EMPTY_TEXT));
                }
                self.submit_edit(session, user_id, &question_id, trimmed).await
            }
            SessionState::ChoosingCategory => Ok(category_picker()),
            SessionState::Idle => self.handle_menu_text(session, user_id, trimmed),
        }
    }

    /// In the idle state free text is interpreted as a menu selection.
    fn handle_menu_text(
        &self,
        session: &mut Session,
        user_id: i64,
        label: &str,
    ) -> CoreResult<Render> {
        match label {
            text::menu::ASK_QUESTION => {
                session.state = SessionState::ChoosingCategory;
                Ok(category_picker())
            }
            text::menu::MY_QUESTIONS => Ok(self.my_questions(user_id, false)),
            text::menu::MY_ANSWERS => Ok(self.my_questions(user_id, true)),
            text::menu::HELP => Ok(Render::text(text::HELP)),
            text::menu::CHANNEL => Ok(self.channel_link()),
            text::admin_menu::NEW_QUESTIONS => {
                self.admins.authorize(user_id)?;
                Ok(self.open_list(session, ListFilter::Status(Status::Pending)))
            }
            text::admin_menu::IMPORTANT => {
                self.admins.authorize(user_id)?;
                Ok(self.open_list(session, ListFilter::Important))
            }
            text::admin_menu::ANSWERED => {
                self.admins.authorize(user_id)?;
                Ok(self.open_list(session, ListFilter::Status(Status::Answered)))
            }
            text::admin_menu::REJECTED => {
                self.admins.authorize(user_id)?;
                Ok(self.open_list(session, ListFilter::Status(Status::Rejected)))
            }
            text::admin_menu::STATS => {
                self.admins.authorize(user_id)?;
                Ok(self.stats_view(user_id))
            }
            text::admin_menu::MAIN_MENU => {
                session.reset();
                Ok(self.main_menu(text::WELCOME))
            }
            _ => Ok(self.main_menu(text::WELCOME)),
        }
    }

    async fn handle_button(
        &self,
        session: &mut Session,
        user_id: i64,
        action: Action,
    ) -> CoreResult<Render> {
        match action {
            Action::SelectCategory(category) => {
                session.state = SessionState::AwaitingQuestionText { category };
                Ok(Render::text(text::TYPE_QUESTION))
            }
            Action::BackToMain => {
                session.reset();
                Ok(self.main_menu(text::WELCOME))
            }
            Action::AdminMenu => {
                self.admins.authorize(user_id)?;
                session.reset();
                Ok(self.admin_menu())
            }
            Action::Stats => Ok(self.stats_view(user_id)),
            Action::Page(page) => {
                self.admins.authorize(user_id)?;
                let browse = session
                    .browse
                    .as_mut()
                    .ok_or_else(|| CoreError::Validation("no open list to page".to_string()))?;
                browse.page = page;
                Ok(self.render_page(browse))
            }
            Action::View(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                Ok(question_detail(&q))
            }
            Action::Answer(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                rules::ensure_answerable(&q)?;
                session.state = SessionState::Answering { question_id: id };
                Ok(Render::text(text::TYPE_ANSWER))
            }
            Action::Edit(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                rules::ensure_editable(&q)?;
                session.state = SessionState::Editing { question_id: id };
                Ok(Render::text(text::TYPE_NEW_ANSWER))
            }
            Action::Reject(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                let patch = rules::reject(&q)?;
                let q = self.store.update(&id, patch)?;
                Ok(question_detail(&q))
            }
            Action::Restore(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                let patch = rules::restore(&q)?;
                let q = self.store.update(&id, patch)?;
                Ok(question_detail(&q))
            }
            Action::ToggleImportant(id) => {
                self.admins.authorize(user_id)?;
                let q = self.store.get(&id)?;
                let patch = rules::toggle_important(&q);
                let q = self.store.update(&id, patch)?;
                Ok(question_detail(&q))
            }
        }
    }

    async fn submit_question(
        &self,
        session: &mut Session,
        user_id: i64,
        category: Category,
        question_text: &str,
    ) -> CoreResult<Render> {
        let question = self.store.create(category, question_text, user_id)?;

        // Admin alerting is best effort: the question is already durable.
        if let Err(err) = self.notifier.notify_admins(&text::admin_alert(&question)).await {
            tracing::warn!(id = %question.id, error = %err, "admin alert failed");
        }

        session.reset();
        Ok(self.main_menu(text::QUESTION_ACCEPTED))
    }

    async fn submit_answer(
        &self,
        session: &mut Session,
        user_id: i64,
        question_id: &str,
        answer: &str,
    ) -> CoreResult<Render> {
        self.admins.authorize(user_id)?;

        // Re-fetch and re-guard: another admin may have handled this
        // question while the answer was being typed.
        let question = self.store.get(question_id)?;
        rules::ensure_answerable(&question)?;

        let post = text::channel_post(&question, answer, false);
        let message_id = self
            .publisher
            .publish(&post)
            .await
            .map_err(|err| CoreError::Publish(err.to_string()))?;

        let updated = self.store.update(
            question_id,
            QuestionPatch {
                status: Some(Status::Answered),
                answer: Some(answer.to_string()),
                answer_time: Some(Utc::now()),
                published_message_id: Some(message_id),
                ..QuestionPatch::default()
            },
        );
        let updated = match updated {
            Ok(q) => q,
            Err(err) => {
                // The post is already public. Do not try to claw it back;
                // surface the store failure and leave the post standing.
                tracing::error!(id = %question_id, error = %err, "published answer failed to persist");
                return Err(err.into());
            }
        };

        if let Err(err) = self
            .notifier
            .notify_user(
                updated.user_id,
                &text::answer_notification(&updated),
                self.channel_url.as_deref(),
            )
            .await
        {
            tracing::warn!(id = %updated.id, error = %err, "asker notification failed");
        }

        session.reset();
        Ok(question_detail(&updated))
    }

    async fn submit_edit(
        &self,
        session: &mut Session,
        user_id: i64,
        question_id: &str,
        answer: &str,
    ) -> CoreResult<Render> {
        self.admins.authorize(user_id)?;

        let question = self.store.get(question_id)?;
        rules::ensure_editable(&question)?;

        // Prefer an in-place edit of the existing post. If the post is
        // gone or refuses the edit, publish a fresh marked post instead.
        let mut new_message_id = None;
        match question.published_message_id {
            Some(message_id) => {
                let post = text::channel_post(&question, answer, false);
                if let Err(err) = self.publisher.edit(message_id, &post).await {
                    tracing::warn!(id = %question_id, error = %err, "in-place edit failed, republishing");
                    let repost = text::channel_post(&question, answer, true);
                    let id = self
                        .publisher
                        .publish(&repost)
                        .await
                        .map_err(|err| CoreError::Publish(err.to_string()))?;
                    new_message_id = Some(id);
                }
            }
            None => {
                let post = text::channel_post(&question, answer, true);
                let id = self
                    .publisher
                    .publish(&post)
                    .await
                    .map_err(|err| CoreError::Publish(err.to_string()))?;
                new_message_id = Some(id);
            }
        }

        let updated = self.store.update(
            question_id,
            QuestionPatch {
                answer: Some(answer.to_string()),
                answer_time: Some(Utc::now()),
                published_message_id: new_message_id,
                ..QuestionPatch::default()
            },
        )?;

        session.reset();
        Ok(question_detail(&updated))
    }

    fn my_questions(&self, user_id: i64, answered_only: bool) -> Render {
        let questions: Vec<Question> = self
            .store
            .list_by_user(user_id)
            .into_iter()
            .filter(|q| !answered_only || q.answer.is_some())
            .collect();

        if questions.is_empty() {
            let empty = if answered_only {
                text::NO_ANSWERS_YET
            } else {
                text::NO_QUESTIONS_YET
            };
            return Render::text(empty);
        }

        let body = questions
            .iter()
            .map(text::question_for_user)
            .collect::<Vec<_>>()
            .join("\n\n——————\n\n");
        Render::text(body)
    }

    fn open_list(&self, session: &mut Session, filter: ListFilter) -> Render {
        let ids: Vec<String> = match filter {
            ListFilter::Status(status) => self
                .store
                .list_by_status(status)
                .into_iter()
                .map(|q| q.id)
                .collect(),
            ListFilter::Important => self
                .store
                .list_important()
                .into_iter()
                .map(|q| q.id)
                .collect(),
        };

        let browse = Browse {
            filter,
            page: 0,
            ids,
        };
        let render = self.render_page(&browse);
        session.browse = Some(browse);
        render
    }

    fn render_page(&self, browse: &Browse) -> Render {
        if browse.ids.is_empty() {
            return Render::text(text::LIST_EMPTY).action_row("⬅️ Back", Action::AdminMenu);
        }

        let pages = browse.ids.len().div_ceil(PAGE_SIZE);
        let page = browse.page.min(pages - 1);
        let start = page * PAGE_SIZE;
        let slice = &browse.ids[start..(start + PAGE_SIZE).min(browse.ids.len())];

        let title = match browse.filter {
            ListFilter::Status(status) => format!("{} questions", status),
            ListFilter::Important => "⭐ Important questions".to_string(),
        };
        let mut render = Render::text(format!("{title} · page {}/{pages}", page + 1));

        for id in slice {
            // A question may have changed status since the list was
            // captured; show it anyway, the detail view tells the truth.
            if let Ok(q) = self.store.get(id) {
                render = render.action_row(text::list_entry(&q), Action::View(q.id));
            }
        }

        let mut nav = Vec::new();
        if page > 0 {
            nav.push(RenderOption::action("⬅️", Action::Page(page - 1)));
        }
        if page + 1 < pages {
            nav.push(RenderOption::action("➡️", Action::Page(page + 1)));
        }
        nav.push(RenderOption::action("🛠 Menu", Action::AdminMenu));
        render.row(nav)
    }

    fn stats_view(&self, user_id: i64) -> Render {
        if self.admins.is_admin(user_id) {
            let all = self.store.list_all();
            let stats = DetailedStats::compute(&all);
            Render::text(text::detailed_stats(&stats))
        } else {
            Render::text(text::stats_summary(&self.store.stats()))
        }
    }

    fn channel_link(&self) -> Render {
        match &self.channel_url {
            Some(url) => {
                Render::text("Our channel:").row(vec![RenderOption::link("📢 Open channel", url)])
            }
            None => Render::text("The channel link is not configured."),
        }
    }

    fn main_menu(&self, text_body: &str) -> Render {
        Render::text(text_body).menu_rows(&[
            &[text::menu::ASK_QUESTION, text::menu::MY_QUESTIONS],
            &[text::menu::MY_ANSWERS, text::menu::HELP],
            &[text::menu::CHANNEL],
        ])
    }

    fn admin_menu(&self) -> Render {
        Render::text(text::ADMIN_MENU_TITLE).menu_rows(&[
            &[text::admin_menu::NEW_QUESTIONS, text::admin_menu::IMPORTANT],
            &[text::admin_menu::ANSWERED, text::admin_menu::REJECTED],
            &[text::admin_menu::STATS, text::admin_menu::MAIN_MENU],
        ])
    }
}

fn category_picker() -> Render {
    let mut render = Render::text(text::CHOOSE_CATEGORY);
    for pair in Category::ALL.chunks(2) {
        render = render.row(
            pair.iter()
                .map(|cat| RenderOption::action(cat.label(), Action::SelectCategory(*cat)))
                .collect(),
        );
    }
    render.action_row("⬅️ Back", Action::BackToMain)
}

/// Admin detail view with the actions legal for the current status.
fn question_detail(q: &Question) -> Render {
    let mut actions = Vec::new();
    match q.status {
        Status::Pending => {
            actions.push(RenderOption::action("💬 Answer", Action::Answer(q.id.clone())));
            actions.push(RenderOption::action("❌ Reject", Action::Reject(q.id.clone())));
        }
        Status::Answered => {
            actions.push(RenderOption::action("✏️ Edit answer", Action::Edit(q.id.clone())));
            actions.push(RenderOption::action("❌ Reject", Action::Reject(q.id.clone())));
        }
        Status::Rejected => {
            actions.push(RenderOption::action("♻️ Restore", Action::Restore(q.id.clone())));
        }
    }
    let star = if q.important { "☆ Unmark" } else { "⭐ Mark important" };

    Render::text(text::question_for_admin(q))
        .row(actions)
        .row(vec![
            RenderOption::action(star, Action::ToggleImportant(q.id.clone())),
            RenderOption::action("🛠 Menu", Action::AdminMenu),
        ])
}
