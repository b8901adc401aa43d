use boxdetect_image::{Image, ImageSize};
use boxdetect_imgproc::{
    morphology::{
        enhance_image, generate_line_bank, generate_rect_bank, merge_transformations,
        MergeOptions, MorphOp, MorphologyError, RectBankConfig,
    },
    parallel::ExecutionStrategy,
    threshold::adaptive_threshold_image,
};

fn square_scene(
    size: usize,
    square: usize,
    offset: usize,
    value: u8,
) -> Result<Image<u8, 1>, MorphologyError> {
    let mut img = Image::<u8, 1>::from_size_val([size, size].into(), 0)?;
    for y in offset..offset + square {
        for x in offset..offset + square {
            img.set_pixel(x, y, 0, value)?;
        }
    }
    Ok(img)
}

/// Returns `(x_min, y_min, x_max, y_max)` of the nonzero pixels, bounds inclusive.
fn bounding_box(img: &Image<u8, 1>) -> Option<(usize, usize, usize, usize)> {
    let mut bbox: Option<(usize, usize, usize, usize)> = None;
    for (i, &v) in img.as_slice().iter().enumerate() {
        if v == 0 {
            continue;
        }
        let (x, y) = (i % img.cols(), i / img.cols());
        bbox = Some(match bbox {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bbox
}

fn iou(a: (usize, usize, usize, usize), b: (usize, usize, usize, usize)) -> f64 {
    let ix = (a.2.min(b.2) + 1).saturating_sub(a.0.max(b.0));
    let iy = (a.3.min(b.3) + 1).saturating_sub(a.1.max(b.1));
    let inter = (ix * iy) as f64;
    let area = |r: (usize, usize, usize, usize)| ((r.2 - r.0 + 1) * (r.3 - r.1 + 1)) as f64;
    inter / (area(a) + area(b) - inter)
}

#[test]
fn zero_image_single_kernel_stays_zero() -> Result<(), MorphologyError> {
    let src = Image::<u8, 1>::from_size_val(
        ImageSize {
            width: 100,
            height: 100,
        },
        0,
    )?;
    let config = RectBankConfig {
        ratio_range: (0.5, 1.1),
        min_width: 40,
        max_width: 41,
        min_height: 40,
        max_height: 41,
        border: 1,
    };
    let bank = generate_rect_bank(&config)?;
    assert_eq!(bank.len(), 1);
    assert_eq!(bank.as_slice()[0].width(), 42);
    assert_eq!(bank.as_slice()[0].height(), 42);

    let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;
    assert_eq!(merged.size(), src.size());
    assert!(merged.as_slice().iter().all(|&v| v == 0));
    Ok(())
}

#[test]
fn square_footprint_is_recovered() -> Result<(), MorphologyError> {
    let src = square_scene(200, 50, 75, 255)?;
    let config = RectBankConfig {
        ratio_range: (0.8, 1.2),
        min_width: 45,
        max_width: 56,
        min_height: 45,
        max_height: 56,
        border: 1,
    };
    let bank = generate_rect_bank(&config)?;
    assert!(!bank.is_empty());

    let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;

    // opening never grows the foreground
    for y in 0..200 {
        for x in 0..200 {
            if *merged.get_pixel(x, y, 0)? == 255 {
                assert!((75..125).contains(&x) && (75..125).contains(&y));
            }
        }
    }

    let found = bounding_box(&merged).ok_or(MorphologyError::InvalidConfiguration(
        "no foreground recovered".to_string(),
    ))?;
    assert!(iou(found, (75, 75, 124, 124)) >= 0.8);
    Ok(())
}

#[test]
fn gradient_threshold_selects_dark_columns() -> Result<(), MorphologyError> {
    let width = 256;
    let data = (0..8).flat_map(|_| 0..=255u8).collect();
    let src = Image::<u8, 1>::new(ImageSize { width, height: 8 }, data)?;

    let mask = adaptive_threshold_image(&src)?;

    // the mean column intensity is 127.5
    for y in 0..8 {
        for x in 0..width {
            let expected = if (x as f64) < 127.5 { 255 } else { 0 };
            assert_eq!(mask.get_pixel(x, y, 0)?, &expected, "column {x}");
        }
    }
    Ok(())
}

#[test]
fn outlined_box_survives_full_pipeline() -> Result<(), MorphologyError> {
    // light page with a dark box outline of thickness 2
    let mut page = Image::<u8, 1>::from_size_val([200, 160].into(), 230)?;
    for y in 60..110 {
        for x in 60..110 {
            let on_outline = x < 62 || x >= 108 || y < 62 || y >= 108;
            if on_outline {
                page.set_pixel(x, y, 0, 20)?;
            }
        }
    }

    let mask = adaptive_threshold_image(&page)?;
    assert_eq!(mask.get_pixel(60, 60, 0)?, &255);
    assert_eq!(mask.get_pixel(80, 80, 0)?, &0);

    let config = RectBankConfig {
        min_width: 44,
        max_width: 52,
        min_height: 44,
        max_height: 52,
        ..Default::default()
    };
    let bank = generate_rect_bank(&config)?;
    let options = MergeOptions {
        strategy: ExecutionStrategy::Parallel,
        debug: None,
    };
    let merged = merge_transformations(&mask, &bank, MorphOp::Open, &options)?;

    assert_eq!(bounding_box(&merged), Some((60, 60, 109, 109)));
    Ok(())
}

#[test]
fn line_bank_removes_isolated_noise() -> Result<(), MorphologyError> {
    let mut src = Image::<u8, 1>::from_size_val([64, 64].into(), 0)?;
    // a long horizontal stroke and a speck
    for x in 10..50 {
        src.set_pixel(x, 20, 0, 255)?;
        src.set_pixel(x, 21, 0, 255)?;
    }
    src.set_pixel(40, 40, 0, 255)?;

    let bank = generate_line_bank(8)?;
    let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;

    assert_eq!(merged.get_pixel(40, 40, 0)?, &0);
    for x in 10..50 {
        assert_eq!(merged.get_pixel(x, 20, 0)?, &255);
        assert_eq!(merged.get_pixel(x, 21, 0)?, &255);
    }
    Ok(())
}

#[test]
fn enhance_is_deterministic_across_strategies() -> Result<(), MorphologyError> {
    let src = square_scene(96, 30, 20, 255)?;
    let bank = generate_line_bank(6)?;

    let serial = enhance_image(
        &src,
        &bank,
        &MergeOptions {
            strategy: ExecutionStrategy::Serial,
            debug: None,
        },
    )?;
    let fixed = enhance_image(
        &src,
        &bank,
        &MergeOptions {
            strategy: ExecutionStrategy::Fixed(2),
            debug: None,
        },
    )?;
    assert_eq!(serial, fixed);
    assert!(serial.as_slice().iter().all(|&v| v == 0 || v == 255));
    Ok(())
}
