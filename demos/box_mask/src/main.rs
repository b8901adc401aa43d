use argh::FromArgs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use boxdetect::image::{Image, ImageSize};
use boxdetect::imgproc::{
    self,
    draw::Rect,
    morphology::{EnhanceOrder, MergeOptions, MorphOp, RectBankConfig},
    parallel::ExecutionStrategy,
};

#[derive(FromArgs)]
/// Synthesize a page with box outlines and extract the box mask
struct Args {
    /// width of the synthetic page
    #[argh(option, default = "640")]
    width: usize,

    /// height of the synthetic page
    #[argh(option, default = "480")]
    height: usize,

    /// number of boxes to draw
    #[argh(option, short = 'n', default = "6")]
    num_boxes: usize,

    /// fraction of pixels turned into dark noise
    #[argh(option, default = "0.01")]
    noise: f64,

    /// seed of the random generator
    #[argh(option, default = "42")]
    seed: u64,

    /// number of threads, 0 to use the global pool
    #[argh(option, default = "0")]
    num_threads: usize,

    /// also run the close/open enhancement
    #[argh(switch, short = 'e')]
    enhance: bool,
}

fn synthesize_page(
    args: &Args,
    rng: &mut StdRng,
) -> Result<(Image<u8, 1>, Vec<Rect>), Box<dyn std::error::Error>> {
    let mut page = Image::<u8, 1>::from_size_val(
        ImageSize {
            width: args.width,
            height: args.height,
        },
        235,
    )?;

    // interiors in the default bank range, outer size = interior + 2
    let mut boxes = Vec::with_capacity(args.num_boxes);
    for _ in 0..args.num_boxes {
        let side = rng.random_range(42..=56) as i64;
        let max_x = (args.width as i64 - side).max(1);
        let max_y = (args.height as i64 - side).max(1);
        boxes.push(Rect {
            x: rng.random_range(0..max_x),
            y: rng.random_range(0..max_y),
            width: side - 1,
            height: side - 1,
        });
    }
    imgproc::draw::draw_rects(&mut page, &boxes, [25], 1);

    for px in page.as_slice_mut() {
        if rng.random_bool(args.noise) {
            *px = 25;
        }
    }

    Ok((page, boxes))
}

fn foreground(img: &Image<u8, 1>) -> usize {
    img.as_slice().iter().filter(|&&v| v > 0).count()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let (page, boxes) = synthesize_page(&args, &mut rng)?;
    log::info!("synthesized {} page with {} boxes", page.size(), boxes.len());

    let hook = |label: &str, img: &Image<u8, 1>| {
        log::info!("{label}: {} foreground pixels", foreground(img));
    };

    // dark strokes become foreground
    let mask = imgproc::threshold::adaptive_threshold_with_debug(&page, Some(&hook))?;

    let bank = imgproc::morphology::generate_rect_bank(&RectBankConfig::default())?;
    log::info!("rect bank has {} kernels", bank.len());

    let options = MergeOptions {
        strategy: match args.num_threads {
            0 => ExecutionStrategy::Parallel,
            n => ExecutionStrategy::Fixed(n),
        },
        debug: Some(&hook),
    };

    let start = std::time::Instant::now();
    let merged =
        imgproc::morphology::merge_transformations(&mask, &bank, MorphOp::Open, &options)?;
    log::info!("merge took {:?}", start.elapsed());

    if args.enhance {
        let start = std::time::Instant::now();
        imgproc::morphology::enhance_image_with_order(
            &mask,
            &bank,
            EnhanceOrder::CloseOpen,
            &options,
        )?;
        log::info!("enhance took {:?}", start.elapsed());
    }

    // count the drawn boxes whose top-left corner survived the merge
    let recovered = boxes
        .iter()
        .filter(|rect| {
            merged
                .get_pixel(rect.x as usize, rect.y as usize, 0)
                .is_ok_and(|&v| v == 255)
        })
        .count();
    log::info!("recovered {recovered}/{} box outlines", boxes.len());

    Ok(())
}
