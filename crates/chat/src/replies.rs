//! User-facing reply shapes and the Korean copy for every outcome.
//!
//! Handlers return typed outcomes; this module owns the phrasing, so the
//! wording lives in exactly one place.

use shiftbot_core::domain::slot::{FillState, Slot};
use shiftbot_core::timeparse::{format_duration, format_short};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    List { title: String, items: Vec<ListItem>, page: u32, has_prev: bool, has_next: bool },
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }
}

pub fn fill_marker(slot: &Slot) -> &'static str {
    match slot.fill_state() {
        FillState::Full => "🔴 마감",
        FillState::Open if slot.current_count > 0 => "🟡 모집중",
        FillState::Open => "🟢 모집중",
    }
}

pub fn slot_line(slot: &Slot) -> String {
    format!(
        "{} ({}) {} {}/{}",
        format_short(slot.slot_at),
        format_duration(slot.duration_minutes),
        fill_marker(slot),
        slot.current_count,
        slot.capacity,
    )
}

pub fn welcome(nickname: &str) -> String {
    format!("{nickname}님, 환영합니다! '근무표'로 모집 중인 근무를 확인할 수 있어요.")
}

pub fn usage(nickname: &str) -> String {
    format!("{nickname}님, '근무표'로 모집 중인 근무를 확인하고 신청할 수 있어요.")
}

pub fn admin_only() -> String {
    "관리자만 사용할 수 있는 기능입니다.".to_string()
}

pub fn no_slot_at(at_text: &str) -> String {
    format!("{at_text}에는 등록된 근무가 없습니다.")
}

pub fn applied(at_text: &str, current: u32, capacity: u32) -> String {
    format!("{at_text} 근무에 신청되었습니다. ({current}/{capacity})")
}

pub fn already_claimed() -> String {
    "이미 신청하셨습니다.".to_string()
}

pub fn already_full() -> String {
    "이미 마감되었습니다.".to_string()
}

pub fn cancel_done() -> String {
    "신청이 취소되었습니다.".to_string()
}

pub fn cancel_not_found() -> String {
    "취소할 신청을 찾을 수 없습니다.".to_string()
}

pub fn no_upcoming_slots() -> String {
    "예정된 근무가 없습니다.".to_string()
}

pub fn no_claims() -> String {
    "신청한 근무가 없습니다.".to_string()
}

pub fn register_summary(created: u32, duplicated: u32, invalid: u32) -> String {
    let mut parts = vec![format!("등록 {created}건")];
    if duplicated > 0 {
        parts.push(format!("중복 {duplicated}건"));
    }
    if invalid > 0 {
        parts.push(format!("오류 {invalid}건"));
    }
    parts.join(", ")
}

pub fn modify_prompt(at_text: &str) -> String {
    format!("{at_text} 근무를 선택했습니다. 변경할 새 시간을 입력해주세요.")
}

pub fn modify_no_selection() -> String {
    "수정할 근무를 먼저 선택해주세요.".to_string()
}

pub fn reschedule_done(from_text: &str, to_text: &str) -> String {
    format!("근무 시간이 변경되었습니다: {from_text} → {to_text}")
}

pub fn reschedule_conflict(to_text: &str) -> String {
    format!("{to_text}에는 이미 다른 근무가 있습니다.")
}

pub fn reschedule_missing() -> String {
    "선택한 근무가 이미 삭제되었습니다.".to_string()
}

pub fn capacity_done(at_text: &str, capacity: u32) -> String {
    format!("{at_text} 근무의 모집 인원을 {capacity}명으로 변경했습니다.")
}

pub fn capacity_below_count(current: u32) -> String {
    format!("현재 신청 인원({current}명)보다 적게 설정할 수 없습니다.")
}

pub fn delete_done(at_text: &str, removed_claims: u32) -> String {
    if removed_claims == 0 {
        format!("{at_text} 근무를 삭제했습니다.")
    } else {
        format!("{at_text} 근무를 삭제했습니다. (신청 {removed_claims}건 함께 삭제)")
    }
}

pub fn admin_added(nickname: &str) -> String {
    format!("{nickname}님을 관리자로 추가했습니다.")
}

pub fn admin_already() -> String {
    "이미 관리자입니다.".to_string()
}

pub fn admin_removed() -> String {
    "관리자 권한을 해제했습니다.".to_string()
}

pub fn admin_not_an_admin() -> String {
    "해당 사용자는 관리자가 아닙니다.".to_string()
}

pub fn admin_protected() -> String {
    "최초 관리자는 해제할 수 없습니다.".to_string()
}

pub fn admin_self_removal() -> String {
    "자기 자신의 권한은 해제할 수 없습니다.".to_string()
}

pub fn transient_failure() -> String {
    "잠시 후 다시 시도해주세요.".to_string()
}
