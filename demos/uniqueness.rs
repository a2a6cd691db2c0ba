//! Compares responses of several simulated devices to the same challenge and
//! of one device to several challenges.
use puf_sign::{fixed_challenge, respond, ArbiterPuf};

const STAGES: usize = 256;

fn main() {
    let challenge = fixed_challenge(STAGES, 1);
    let devices: Vec<ArbiterPuf> = (40..48)
        .map(|seed| ArbiterPuf::new(STAGES, seed).expect("positive stage count"))
        .collect();
    let responses: Vec<_> = devices
        .iter()
        .map(|puf| respond(puf, &challenge).expect("matching width"))
        .collect();

    let mut total = 0u32;
    let mut pairs = 0u32;
    for i in 0..responses.len() {
        for j in (i + 1)..responses.len() {
            total += responses[i].hamming_distance(&responses[j]).unwrap_or(0);
            pairs += 1;
        }
    }
    println!(
        "inter-device distance: {:.1}% over {} pairs",
        100.0 * total as f64 / (pairs as f64 * STAGES as f64),
        pairs
    );

    let puf = &devices[5];
    let base = respond(puf, &challenge).expect("matching width");
    for seed in 2..6 {
        let other = respond(puf, &fixed_challenge(STAGES, seed)).expect("matching width");
        let distance = base.hamming_distance(&other).unwrap_or(0);
        println!("challenge seed {seed}: {distance} of {STAGES} bits differ");
    }
}
