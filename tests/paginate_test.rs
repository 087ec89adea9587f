//! Tests for [`Paginator`].

use citylight::Paginator;

fn pager(items: usize, page_size: usize) -> Paginator<usize> {
    let mut p = Paginator::new(page_size);
    p.set_data((0..items).collect());
    p
}

#[test]
fn twenty_five_items_in_pages_of_ten() {
    let mut p = pager(25, 10);
    assert_eq!(p.total_pages(), 3);

    assert_eq!(p.page(0), (0..10).collect::<Vec<_>>().as_slice());
    assert!(p.has_next_page());
    assert!(!p.has_previous_page());

    assert_eq!(p.page(2), &[20, 21, 22, 23, 24]);
    assert!(!p.has_next_page());
    assert!(p.has_previous_page());
}

#[test]
fn out_of_range_page_is_empty() {
    let mut p = pager(25, 10);
    assert!(p.page(3).is_empty());
    assert!(p.page(99).is_empty());
    assert_eq!(p.current_page(), 99);
    assert!(!p.has_next_page());
}

#[test]
fn set_data_keeps_current_page() {
    let mut p = pager(25, 10);
    let _ = p.page(2);
    p.set_data((0..5).collect());

    assert_eq!(p.current_page(), 2);
    assert_eq!(p.item_count(), 5);
    assert_eq!(p.total_pages(), 1);
    assert!(!p.has_next_page());
}

#[test]
fn exact_multiple_has_no_partial_page() {
    let p = pager(30, 10);
    assert_eq!(p.total_pages(), 3);
}

#[test]
fn zero_page_size_is_clamped() {
    let mut p = pager(3, 0);
    assert_eq!(p.page_size(), 1);
    assert_eq!(p.total_pages(), 3);
    assert_eq!(p.page(1), &[1]);
}

#[test]
fn info_reflects_current_page() {
    let mut p = pager(25, 10);
    let _ = p.page(1);
    let info = p.info();
    assert_eq!(info.page, 1);
    assert_eq!(info.total_pages, 3);
    assert_eq!(info.item_count, 25);
    assert!(info.has_next);
    assert!(info.has_previous);
}
