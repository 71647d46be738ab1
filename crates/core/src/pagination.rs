//! Offset pagination over a stable ordering.
//!
//! Pages are 1-indexed (page 0 coerces to 1). Repositories fetch
//! `page_size + 1` rows so `has_next` needs no second count query; a page
//! past the end is empty with `has_next = false`.

pub const DEFAULT_PAGE_SIZE: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub has_prev: bool,
    pub has_next: bool,
}

pub fn normalize_page(page: u32) -> u32 {
    page.max(1)
}

pub fn offset(page: u32, page_size: u32) -> u32 {
    (normalize_page(page) - 1).saturating_mul(page_size)
}

/// Build a page from rows fetched with `LIMIT page_size + 1`.
pub fn from_overfetched<T>(mut rows: Vec<T>, page: u32, page_size: u32) -> Page<T> {
    let page = normalize_page(page);
    let has_next = rows.len() > page_size as usize;
    rows.truncate(page_size as usize);
    Page { items: rows, page, has_prev: page > 1, has_next }
}
