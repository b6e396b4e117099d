//! Print the blend operator table.

use vjmix_render_engine::BlendTable;

pub fn run(overlay_boost: f32, json: bool) -> anyhow::Result<()> {
    let table = BlendTable::new(overlay_boost);

    if json {
        let operators: Vec<_> = table.iter().collect();
        println!("{}", serde_json::to_string_pretty(&operators)?);
        return Ok(());
    }

    println!(
        "{:<11} {:<17} {:<20} {:<20} {}",
        "mode", "equation", "src factor", "dst factor", "opacity"
    );
    for op in table.iter() {
        println!(
            "{:<11} {:<17} {:<20} {:<20} x{}",
            op.mode.as_str(),
            format!("{:?}", op.equation),
            format!("{:?}", op.src_factor),
            format!("{:?}", op.dst_factor),
            op.opacity_scale
        );
    }
    Ok(())
}
