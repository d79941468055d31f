use dwarf_treemap::layout::{Rect, layout_treemap};

#[test]
fn layout_rects_stay_within_bounds() {
    let sizes = [10, 20, 30, 40];
    let bounds = Rect::new(0.0, 0.0, 800.0, 600.0);

    let laid_out = layout_treemap(&sizes, bounds);
    assert_eq!(laid_out.len(), sizes.len());

    for entry in laid_out {
        assert!(entry.rect.width >= 0.0);
        assert!(entry.rect.height >= 0.0);

        assert!(entry.rect.x + entry.rect.width <= bounds.x + bounds.width + 1e-6);
        assert!(entry.rect.y + entry.rect.height <= bounds.y + bounds.height + 1e-6);
        assert!(entry.rect.x >= bounds.x - 1e-6);
        assert!(entry.rect.y >= bounds.y - 1e-6);
    }
}

#[test]
fn layout_area_is_conserved_reasonably() {
    let sizes = [1, 1, 2, 6];
    let bounds = Rect::new(0.0, 0.0, 1000.0, 500.0);

    let laid_out = layout_treemap(&sizes, bounds);
    let laid_out_area = laid_out.iter().map(|entry| entry.rect.area()).sum::<f64>();
    let bounds_area = bounds.area();
    let error = (bounds_area - laid_out_area).abs();

    assert!(error <= bounds_area * 1e-6);
}

#[test]
fn layout_area_is_proportional_to_size() {
    let sizes = [6, 3, 1];
    let bounds = Rect::new(10.0, 20.0, 300.0, 100.0);

    let laid_out = layout_treemap(&sizes, bounds);
    for entry in &laid_out {
        let expected = bounds.area() * sizes[entry.index] as f64 / 10.0;
        assert!((entry.rect.area() - expected).abs() <= expected * 1e-6);
    }
}

#[test]
fn layout_keeps_input_indices_and_skips_zero_sizes() {
    let sizes = [5, 0, 5];
    let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);

    let indices = layout_treemap(&sizes, bounds)
        .iter()
        .map(|entry| entry.index)
        .collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 2]);
}

#[test]
fn layout_returns_empty_for_empty_or_zero_input() {
    let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(layout_treemap(&[], bounds).is_empty());
    assert!(layout_treemap(&[0, 0], bounds).is_empty());
    assert!(layout_treemap(&[1, 2], Rect::new(0.0, 0.0, 0.0, 100.0)).is_empty());
}

#[test]
fn inset_shrinks_every_side_until_nothing_is_left() {
    let rect = Rect::new(0.0, 0.0, 10.0, 6.0);
    assert_eq!(rect.inset(2.0), Some(Rect::new(2.0, 2.0, 6.0, 2.0)));
    assert_eq!(rect.inset(3.0), None);
    assert_eq!(rect.inset(0.0), Some(rect));
}

#[test]
fn layout_is_fast_for_large_inputs() {
    let bounds = Rect::new(0.0, 0.0, 1200.0, 800.0);

    let sizes_10k = build_sizes(10_000);
    let sizes_20k = build_sizes(20_000);

    let duration_10k =
        measure_fastest_duration(|| std::hint::black_box(layout_treemap(&sizes_10k, bounds)).len());
    let duration_20k =
        measure_fastest_duration(|| std::hint::black_box(layout_treemap(&sizes_20k, bounds)).len());

    assert!(duration_10k <= std::time::Duration::from_secs(2));

    let baseline = duration_10k.as_secs_f64().max(1e-9);
    let ratio = duration_20k.as_secs_f64() / baseline;
    assert!(ratio <= 10.0);
}

fn build_sizes(count: usize) -> Vec<u64> {
    let mut seed = 0x9e3779b97f4a7c15u64 ^ (count as u64);
    (0..count)
        .map(|_| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            (seed % 10_000) + 1
        })
        .collect()
}

fn measure_fastest_duration(mut f: impl FnMut() -> usize) -> std::time::Duration {
    std::hint::black_box(f());
    let mut best = std::time::Duration::MAX;
    for _ in 0..5 {
        let start = std::time::Instant::now();
        std::hint::black_box(f());
        best = best.min(start.elapsed());
    }
    best
}
