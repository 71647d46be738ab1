//! Intent dispatch: admin gating, the admission path, and the two-step
//! reschedule flow, all against the repository traits.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

use shiftbot_core::config::AdmissionConfig;
use shiftbot_core::context::ContextStore;
use shiftbot_core::domain::claim::{AdmissionOutcome, CancelOutcome, ClaimId};
use shiftbot_core::domain::slot::{
    self, CapacityOutcome, DeleteOutcome, RegisterOutcome, RescheduleOutcome, Slot,
};
use shiftbot_core::domain::user::UserToken;
use shiftbot_core::errors::CoreError;
use shiftbot_core::timeparse::{format_short, hour_range, resolve_day_hour};
use shiftbot_db::repositories::{
    with_busy_retry, AdminRepository, ClaimRepository, GrantOutcome, RepositoryError,
    RevokeOutcome, SlotRepository, UserRepository,
};

use crate::intents::{Intent, IntentEnvelope, SlotSpec};
use crate::replies::{self, ListItem, Reply};

pub struct Dispatcher {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    slots: Arc<dyn SlotRepository>,
    claims: Arc<dyn ClaimRepository>,
    contexts: ContextStore,
    page_size: u32,
    max_transient_retries: u32,
    retry_backoff: Duration,
}

fn store_err(err: RepositoryError) -> CoreError {
    CoreError::TransientStore(err.to_string())
}

impl Dispatcher {
    pub fn new(
        users: Arc<dyn UserRepository>,
        admins: Arc<dyn AdminRepository>,
        slots: Arc<dyn SlotRepository>,
        claims: Arc<dyn ClaimRepository>,
        admission: &AdmissionConfig,
    ) -> Self {
        Self {
            users,
            admins,
            slots,
            claims,
            contexts: ContextStore::new(admission.context_ttl_minutes),
            page_size: admission.page_size,
            max_transient_retries: admission.max_transient_retries,
            retry_backoff: Duration::from_millis(admission.retry_backoff_ms),
        }
    }

    pub async fn dispatch(&self, envelope: IntentEnvelope) -> Result<Reply, CoreError> {
        self.dispatch_at(envelope, Local::now().naive_local()).await
    }

    /// Dispatch against an explicit clock.
    pub async fn dispatch_at(
        &self,
        envelope: IntentEnvelope,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        // Input, permission, and transient-store problems are conversation,
        // not failures: every inbound message gets a reply.
        match self.route(envelope, now).await {
            Err(CoreError::InvalidInput(message)) => Ok(Reply::text(message)),
            Err(CoreError::PermissionDenied(_)) => Ok(Reply::text(replies::admin_only())),
            Err(CoreError::TransientStore(detail)) => {
                tracing::error!(%detail, "dispatch failed against the store");
                Ok(Reply::text(replies::transient_failure()))
            }
            other => other,
        }
    }

    async fn route(
        &self,
        envelope: IntentEnvelope,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let user = envelope.user;

        if envelope.intent.requires_admin()
            && !self.admins.is_admin(&user).await.map_err(store_err)?
        {
            tracing::warn!(user = %user, "blocked non-admin intent");
            return Err(CoreError::PermissionDenied("admin-only intent"));
        }

        match envelope.intent {
            Intent::Welcome { nickname } => self.welcome(&user, &nickname).await,
            Intent::Apply { day, hour, duration_hours } => {
                self.apply(&user, day, hour, duration_hours, now).await
            }
            Intent::ListMyClaims { page } => self.list_my_claims(&user, page, now).await,
            Intent::CancelClaim { claim_id } => {
                self.cancel_claim(&user, ClaimId(claim_id)).await
            }
            Intent::Status => self.status(now).await,
            Intent::RegisterSlots { lines } => self.register_slots(&user, &lines, now).await,
            Intent::ModifySelect { day, hour } => {
                self.modify_select(&user, day, hour, now).await
            }
            Intent::NewTime { day, hour, minute } => {
                self.new_time(&user, day, hour, minute, now).await
            }
            Intent::SetCapacity { day, hour, capacity } => {
                self.set_capacity(&user, day, hour, capacity, now).await
            }
            Intent::DeleteSlot { day, hour } => self.delete_slot(&user, day, hour, now).await,
            Intent::ListClaimants { day, hour, page } => {
                self.list_claimants(day, hour, page, now).await
            }
            Intent::AddAdmin { target, nickname } => {
                self.add_admin(&user, &UserToken(target), &nickname).await
            }
            Intent::RemoveAdmin { target } => {
                self.remove_admin(&user, &UserToken(target)).await
            }
        }
    }

    async fn welcome(&self, user: &UserToken, nickname: &str) -> Result<Reply, CoreError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(CoreError::InvalidInput("닉네임을 입력해주세요.".to_string()));
        }

        // A known user's utterance never renames them; they get the usage
        // summary back instead.
        if let Some(known) = self.users.find(user).await.map_err(store_err)? {
            return Ok(Reply::text(replies::usage(&known.nickname)));
        }

        let registered = self.users.register(user, nickname).await.map_err(store_err)?;
        Ok(Reply::text(replies::welcome(&registered.nickname)))
    }

    /// Locate the slot for the requested hour, if any. A duration given by
    /// the user narrows the match.
    async fn slot_for_hour(
        &self,
        day: u32,
        hour: u32,
        duration_hours: Option<u32>,
        now: NaiveDateTime,
    ) -> Result<Result<Slot, String>, CoreError> {
        let start = resolve_day_hour(now, day, hour, 0)?;
        let (lo, hi) = hour_range(start);
        let found = self.slots.find_in_window(lo, hi).await.map_err(store_err)?;

        let matched = found
            .into_iter()
            .find(|s| duration_hours.map_or(true, |h| s.duration_minutes == h * 60));
        Ok(matched.ok_or_else(|| replies::no_slot_at(&format_short(start))))
    }

    async fn apply(
        &self,
        user: &UserToken,
        day: u32,
        hour: u32,
        duration_hours: Option<u32>,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let slot = match self.slot_for_hour(day, hour, duration_hours, now).await? {
            Ok(slot) => slot,
            Err(message) => return Ok(Reply::text(message)),
        };

        self.users.ensure(user).await.map_err(store_err)?;

        let outcome = with_busy_retry(self.max_transient_retries, self.retry_backoff, || {
            self.claims.try_claim(user, slot.id)
        })
        .await
        .map_err(store_err)?;

        let at_text = format_short(slot.slot_at);
        Ok(match outcome {
            AdmissionOutcome::Accepted { current_count, capacity } => {
                tracing::info!(user = %user, slot_id = slot.id.0, current_count, capacity, "claim accepted");
                Reply::text(replies::applied(&at_text, current_count, capacity))
            }
            AdmissionOutcome::AlreadyClaimed => Reply::text(replies::already_claimed()),
            AdmissionOutcome::Full => Reply::text(replies::already_full()),
            AdmissionOutcome::SlotNotFound => Reply::text(replies::no_slot_at(&at_text)),
        })
    }

    async fn list_my_claims(
        &self,
        user: &UserToken,
        page: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let claims = self
            .claims
            .list_user_claims(user, now, page, self.page_size)
            .await
            .map_err(store_err)?;

        if claims.items.is_empty() && claims.page == 1 {
            return Ok(Reply::text(replies::no_claims()));
        }

        let items = claims
            .items
            .iter()
            .map(|entry| ListItem {
                title: replies::slot_line(&entry.slot),
                description: format!("신청번호 {}", entry.claim_id.0),
            })
            .collect();

        Ok(Reply::List {
            title: "나의 신청 내역".to_string(),
            items,
            page: claims.page,
            has_prev: claims.has_prev,
            has_next: claims.has_next,
        })
    }

    async fn cancel_claim(&self, user: &UserToken, claim_id: ClaimId) -> Result<Reply, CoreError> {
        let outcome = self.claims.cancel(user, claim_id).await.map_err(store_err)?;
        Ok(match outcome {
            CancelOutcome::Removed => {
                tracing::info!(user = %user, claim_id = claim_id.0, "claim cancelled");
                Reply::text(replies::cancel_done())
            }
            CancelOutcome::NotFound => Reply::text(replies::cancel_not_found()),
        })
    }

    async fn status(&self, now: NaiveDateTime) -> Result<Reply, CoreError> {
        let upcoming = self.slots.list_upcoming(now).await.map_err(store_err)?;
        if upcoming.is_empty() {
            return Ok(Reply::text(replies::no_upcoming_slots()));
        }

        let items = upcoming
            .iter()
            .map(|slot| ListItem { title: replies::slot_line(slot), description: String::new() })
            .collect();

        Ok(Reply::List {
            title: "근무표".to_string(),
            items,
            page: 1,
            has_prev: false,
            has_next: false,
        })
    }

    /// Batch registration commits line by line; one bad line does not
    /// abort the rest.
    async fn register_slots(
        &self,
        actor: &UserToken,
        lines: &[SlotSpec],
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let mut created = 0;
        let mut duplicated = 0;
        let mut invalid = 0;

        for spec in lines {
            if slot::validate_capacity(spec.capacity).is_err()
                || slot::validate_duration(spec.duration_minutes).is_err()
            {
                invalid += 1;
                continue;
            }

            let at = match resolve_day_hour(now, spec.day, spec.hour, spec.minute) {
                Ok(at) => at,
                Err(_) => {
                    invalid += 1;
                    continue;
                }
            };

            match self
                .slots
                .register(at, spec.duration_minutes, spec.capacity)
                .await
                .map_err(store_err)?
            {
                RegisterOutcome::Created(slot) => {
                    tracing::info!(actor = %actor, slot_id = slot.id.0, at = %slot.slot_at, "slot registered");
                    created += 1;
                }
                RegisterOutcome::DuplicateInstant => duplicated += 1,
            }
        }

        Ok(Reply::text(replies::register_summary(created, duplicated, invalid)))
    }

    async fn modify_select(
        &self,
        actor: &UserToken,
        day: u32,
        hour: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let slot = match self.slot_for_hour(day, hour, None, now).await? {
            Ok(slot) => slot,
            Err(message) => return Ok(Reply::text(message)),
        };

        self.contexts.begin(actor.clone(), slot.id, slot.slot_at);
        Ok(Reply::text(replies::modify_prompt(&format_short(slot.slot_at))))
    }

    async fn new_time(
        &self,
        actor: &UserToken,
        day: u32,
        hour: u32,
        minute: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let pending = match self.contexts.take(actor) {
            Some(pending) => pending,
            None => return Ok(Reply::text(replies::modify_no_selection())),
        };

        let new_at = resolve_day_hour(now, day, hour, minute)?;
        let outcome = self.slots.reschedule(pending.slot_id, new_at).await.map_err(store_err)?;

        Ok(match outcome {
            RescheduleOutcome::Applied => {
                tracing::info!(actor = %actor, slot_id = pending.slot_id.0, from = %pending.original_at, to = %new_at, "slot rescheduled");
                Reply::text(replies::reschedule_done(
                    &format_short(pending.original_at),
                    &format_short(new_at),
                ))
            }
            RescheduleOutcome::DuplicateInstant => {
                Reply::text(replies::reschedule_conflict(&format_short(new_at)))
            }
            RescheduleOutcome::NotFound => Reply::text(replies::reschedule_missing()),
        })
    }

    async fn set_capacity(
        &self,
        actor: &UserToken,
        day: u32,
        hour: u32,
        capacity: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        slot::validate_capacity(capacity)?;

        let slot = match self.slot_for_hour(day, hour, None, now).await? {
            Ok(slot) => slot,
            Err(message) => return Ok(Reply::text(message)),
        };

        let outcome = self.slots.set_capacity(slot.id, capacity).await.map_err(store_err)?;
        let at_text = format_short(slot.slot_at);
        Ok(match outcome {
            CapacityOutcome::Applied => {
                tracing::info!(actor = %actor, slot_id = slot.id.0, capacity, "capacity changed");
                Reply::text(replies::capacity_done(&at_text, capacity))
            }
            CapacityOutcome::BelowCurrentCount { current } => {
                Reply::text(replies::capacity_below_count(current))
            }
            CapacityOutcome::SlotNotFound => Reply::text(replies::no_slot_at(&at_text)),
        })
    }

    async fn delete_slot(
        &self,
        actor: &UserToken,
        day: u32,
        hour: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let slot = match self.slot_for_hour(day, hour, None, now).await? {
            Ok(slot) => slot,
            Err(message) => return Ok(Reply::text(message)),
        };

        let at_text = format_short(slot.slot_at);
        Ok(match self.slots.delete(slot.id).await.map_err(store_err)? {
            DeleteOutcome::Deleted { removed_claims } => {
                tracing::info!(actor = %actor, slot_id = slot.id.0, removed_claims, "slot deleted");
                Reply::text(replies::delete_done(&at_text, removed_claims))
            }
            DeleteOutcome::NotFound => Reply::text(replies::no_slot_at(&at_text)),
        })
    }

    async fn list_claimants(
        &self,
        day: u32,
        hour: u32,
        page: u32,
        now: NaiveDateTime,
    ) -> Result<Reply, CoreError> {
        let slot = match self.slot_for_hour(day, hour, None, now).await? {
            Ok(slot) => slot,
            Err(message) => return Ok(Reply::text(message)),
        };

        let claimants = self
            .claims
            .list_slot_claimants(slot.id, page, self.page_size)
            .await
            .map_err(store_err)?;

        let items = claimants
            .items
            .iter()
            .map(|claimant| ListItem {
                title: claimant.nickname.clone(),
                description: claimant.user_token.0.clone(),
            })
            .collect();

        Ok(Reply::List {
            title: format!("{} 신청자", format_short(slot.slot_at)),
            items,
            page: claimants.page,
            has_prev: claimants.has_prev,
            has_next: claimants.has_next,
        })
    }

    async fn add_admin(
        &self,
        actor: &UserToken,
        target: &UserToken,
        nickname: &str,
    ) -> Result<Reply, CoreError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(CoreError::InvalidInput("닉네임을 입력해주세요.".to_string()));
        }

        // Grants may target users who never messaged the bot.
        let registered = self.users.register(target, nickname).await.map_err(store_err)?;

        Ok(match self.admins.grant(actor, target).await.map_err(store_err)? {
            GrantOutcome::Granted => {
                tracing::info!(actor = %actor, target = %target, "admin granted");
                Reply::text(replies::admin_added(&registered.nickname))
            }
            GrantOutcome::AlreadyAdmin => Reply::text(replies::admin_already()),
            GrantOutcome::UserNotFound => {
                Reply::text("대상 사용자를 찾을 수 없습니다.".to_string())
            }
        })
    }

    async fn remove_admin(&self, actor: &UserToken, target: &UserToken) -> Result<Reply, CoreError> {
        Ok(match self.admins.revoke(actor, target).await.map_err(store_err)? {
            RevokeOutcome::Revoked => {
                tracing::info!(actor = %actor, target = %target, "admin revoked");
                Reply::text(replies::admin_removed())
            }
            RevokeOutcome::NotAnAdmin => Reply::text(replies::admin_not_an_admin()),
            RevokeOutcome::ProtectedSuperAdmin => Reply::text(replies::admin_protected()),
            RevokeOutcome::SelfRemoval => Reply::text(replies::admin_self_removal()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime, Utc};

    use shiftbot_core::config::AppConfig;
    use shiftbot_core::domain::admin::SYSTEM_GRANTOR;
    use shiftbot_core::domain::user::UserToken;
    use shiftbot_db::repositories::{
        SqlAdminRepository, SqlClaimRepository, SqlSlotRepository, SqlUserRepository,
        UserRepository,
    };
    use shiftbot_db::{connect_with_settings, migrations};

    use super::Dispatcher;
    use crate::intents::{Intent, IntentEnvelope, SlotSpec};
    use crate::replies::{self, Reply};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 25)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid fixture datetime")
    }

    fn spec(day: u32, hour: u32, capacity: u32) -> SlotSpec {
        SlotSpec { day, hour, minute: 0, duration_minutes: 240, capacity }
    }

    async fn setup() -> (Dispatcher, sqlx::SqlitePool, UserToken) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let boss = UserToken("boss".to_string());
        SqlUserRepository::new(pool.clone()).register(&boss, "관리자").await.expect("boss user");
        sqlx::query("INSERT INTO admins (user_token, added_by, added_at) VALUES (?, ?, ?)")
            .bind(&boss.0)
            .bind(SYSTEM_GRANTOR)
            .bind(Utc::now().to_rfc3339())
            .execute(&pool)
            .await
            .expect("seed super admin");

        let dispatcher = Dispatcher::new(
            Arc::new(SqlUserRepository::new(pool.clone())),
            Arc::new(SqlAdminRepository::new(pool.clone())),
            Arc::new(SqlSlotRepository::new(pool.clone())),
            Arc::new(SqlClaimRepository::new(pool.clone())),
            &AppConfig::default().admission,
        );

        (dispatcher, pool, boss)
    }

    async fn send(dispatcher: &Dispatcher, user: &UserToken, intent: Intent) -> Reply {
        dispatcher
            .dispatch_at(IntentEnvelope { user: user.clone(), intent }, now())
            .await
            .expect("dispatch")
    }

    fn text_of(reply: Reply) -> String {
        match reply {
            Reply::Text(body) => body,
            Reply::List { title, .. } => panic!("expected text reply, got list `{title}`"),
        }
    }

    #[tokio::test]
    async fn apply_fills_the_slot_then_rejects() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 1)] }).await;

        let winner = UserToken("winner".to_string());
        let loser = UserToken("loser".to_string());

        let accepted = text_of(
            send(&dispatcher, &winner, Intent::Apply { day: 27, hour: 11, duration_hours: None })
                .await,
        );
        assert_eq!(accepted, "11월 27일 11시 근무에 신청되었습니다. (1/1)");

        let full = text_of(
            send(&dispatcher, &loser, Intent::Apply { day: 27, hour: 11, duration_hours: None })
                .await,
        );
        assert_eq!(full, replies::already_full());

        let again = text_of(
            send(&dispatcher, &winner, Intent::Apply { day: 27, hour: 11, duration_hours: None })
                .await,
        );
        assert_eq!(again, replies::already_claimed());
    }

    #[tokio::test]
    async fn non_admin_intents_are_blocked() {
        let (dispatcher, _pool, _boss) = setup().await;
        let user = UserToken("plain".to_string());

        let reply =
            text_of(send(&dispatcher, &user, Intent::RegisterSlots { lines: vec![spec(27, 11, 1)] }).await);
        assert_eq!(reply, replies::admin_only());
    }

    #[tokio::test]
    async fn two_step_reschedule_consumes_the_selection() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;

        let prompt =
            text_of(send(&dispatcher, &boss, Intent::ModifySelect { day: 27, hour: 11 }).await);
        assert_eq!(prompt, replies::modify_prompt("11월 27일 11시"));

        let done = text_of(
            send(&dispatcher, &boss, Intent::NewTime { day: 28, hour: 9, minute: 30 }).await,
        );
        assert_eq!(done, replies::reschedule_done("11월 27일 11시", "11월 28일 9시 30분"));

        // The first step two consumed the selection.
        let orphan = text_of(
            send(&dispatcher, &boss, Intent::NewTime { day: 29, hour: 10, minute: 0 }).await,
        );
        assert_eq!(orphan, replies::modify_no_selection());
    }

    #[tokio::test]
    async fn reschedule_onto_taken_instant_is_reported() {
        let (dispatcher, _pool, boss) = setup().await;

        send(
            &dispatcher,
            &boss,
            Intent::RegisterSlots { lines: vec![spec(27, 11, 3), spec(28, 9, 3)] },
        )
        .await;

        send(&dispatcher, &boss, Intent::ModifySelect { day: 27, hour: 11 }).await;
        let conflict = text_of(
            send(&dispatcher, &boss, Intent::NewTime { day: 28, hour: 9, minute: 0 }).await,
        );
        assert_eq!(conflict, replies::reschedule_conflict("11월 28일 9시"));

        // The failed step still consumed the selection.
        let orphan = text_of(
            send(&dispatcher, &boss, Intent::NewTime { day: 29, hour: 10, minute: 0 }).await,
        );
        assert_eq!(orphan, replies::modify_no_selection());
    }

    #[tokio::test]
    async fn batch_registration_reports_partial_success() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;

        let summary = text_of(
            send(
                &dispatcher,
                &boss,
                Intent::RegisterSlots {
                    lines: vec![spec(27, 11, 3), spec(28, 9, 3), spec(29, 10, 0)],
                },
            )
            .await,
        );
        assert_eq!(summary, "등록 1건, 중복 1건, 오류 1건");
    }

    #[tokio::test]
    async fn repeat_welcome_keeps_the_chosen_nickname() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;

        let user = UserToken("kakao-777".to_string());
        let greeted = text_of(
            send(&dispatcher, &user, Intent::Welcome { nickname: "나비".to_string() }).await,
        );
        assert_eq!(greeted, replies::welcome("나비"));

        // A known user gets the usage summary and is never renamed.
        let again = text_of(
            send(&dispatcher, &user, Intent::Welcome { nickname: "참새".to_string() }).await,
        );
        assert_eq!(again, replies::usage("나비"));

        send(&dispatcher, &user, Intent::Apply { day: 27, hour: 11, duration_hours: None }).await;
        let roster =
            send(&dispatcher, &boss, Intent::ListClaimants { day: 27, hour: 11, page: 1 }).await;
        match roster {
            Reply::List { items, .. } => assert_eq!(items[0].title, "나비"),
            Reply::Text(body) => panic!("expected roster list, got `{body}`"),
        }
    }

    #[tokio::test]
    async fn welcome_nickname_appears_on_the_roster() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;

        let user = UserToken("kakao-777".to_string());
        send(&dispatcher, &user, Intent::Welcome { nickname: "나비".to_string() }).await;
        send(&dispatcher, &user, Intent::Apply { day: 27, hour: 11, duration_hours: None }).await;

        let roster =
            send(&dispatcher, &boss, Intent::ListClaimants { day: 27, hour: 11, page: 1 }).await;
        match roster {
            Reply::List { title, items, .. } => {
                assert_eq!(title, "11월 27일 11시 신청자");
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].title, "나비");
            }
            Reply::Text(body) => panic!("expected roster list, got `{body}`"),
        }
    }

    #[tokio::test]
    async fn capacity_guard_message_carries_the_live_count() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;
        for name in ["a", "b"] {
            let user = UserToken(name.to_string());
            send(&dispatcher, &user, Intent::Apply { day: 27, hour: 11, duration_hours: None })
                .await;
        }

        let denied = text_of(
            send(&dispatcher, &boss, Intent::SetCapacity { day: 27, hour: 11, capacity: 1 }).await,
        );
        assert_eq!(denied, replies::capacity_below_count(2));

        let applied = text_of(
            send(&dispatcher, &boss, Intent::SetCapacity { day: 27, hour: 11, capacity: 2 }).await,
        );
        assert_eq!(applied, replies::capacity_done("11월 27일 11시", 2));
    }

    #[tokio::test]
    async fn cancel_through_the_dispatcher_frees_the_seat() {
        let (dispatcher, pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 1)] }).await;

        let holder = UserToken("holder".to_string());
        send(&dispatcher, &holder, Intent::Apply { day: 27, hour: 11, duration_hours: None }).await;

        use sqlx::Row;
        let claim_id = sqlx::query("SELECT id FROM claims WHERE user_token = ?")
            .bind(&holder.0)
            .fetch_one(&pool)
            .await
            .expect("claim row")
            .get::<i64, _>("id");

        let cancelled = text_of(send(&dispatcher, &holder, Intent::CancelClaim { claim_id }).await);
        assert_eq!(cancelled, replies::cancel_done());

        let next = UserToken("next".to_string());
        let accepted = text_of(
            send(&dispatcher, &next, Intent::Apply { day: 27, hour: 11, duration_hours: None })
                .await,
        );
        assert_eq!(accepted, "11월 27일 11시 근무에 신청되었습니다. (1/1)");
    }

    #[tokio::test]
    async fn super_admin_cannot_be_removed() {
        let (dispatcher, _pool, boss) = setup().await;

        let helper = UserToken("helper".to_string());
        send(
            &dispatcher,
            &boss,
            Intent::AddAdmin { target: helper.0.clone(), nickname: "헬퍼".to_string() },
        )
        .await;

        let denied =
            text_of(send(&dispatcher, &helper, Intent::RemoveAdmin { target: boss.0.clone() }).await);
        assert_eq!(denied, replies::admin_protected());

        let removed =
            text_of(send(&dispatcher, &boss, Intent::RemoveAdmin { target: helper.0.clone() }).await);
        assert_eq!(removed, replies::admin_removed());
    }

    #[tokio::test]
    async fn duration_hint_narrows_the_hour_match() {
        let (dispatcher, _pool, boss) = setup().await;

        send(&dispatcher, &boss, Intent::RegisterSlots { lines: vec![spec(27, 11, 3)] }).await;

        let user = UserToken("picky".to_string());
        let missed = text_of(
            send(&dispatcher, &user, Intent::Apply { day: 27, hour: 11, duration_hours: Some(2) })
                .await,
        );
        assert_eq!(missed, replies::no_slot_at("11월 27일 11시"));

        let matched = text_of(
            send(&dispatcher, &user, Intent::Apply { day: 27, hour: 11, duration_hours: Some(4) })
                .await,
        );
        assert_eq!(matched, "11월 27일 11시 근무에 신청되었습니다. (1/3)");
    }
}
