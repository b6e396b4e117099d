//! Print crossfader weights.

use vjmix_render_engine::mix_weights;

pub fn run(steps: usize) -> anyhow::Result<()> {
    let steps = steps.max(2);
    println!("{:>6}  {:>6}  {:>6}", "fader", "A", "B");
    for i in 0..steps {
        let fader = i as f32 / (steps - 1) as f32;
        let w = mix_weights(fader);
        println!("{fader:>6.3}  {:>6.3}  {:>6.3}", w.a, w.b);
    }
    Ok(())
}
