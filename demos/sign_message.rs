use puf_sign::{OsEntropy, Pipeline, PipelineConfig};

fn main() {
    let pipeline = Pipeline::new(PipelineConfig::default()).expect("default config is valid");
    match pipeline.run("Example message1", &mut OsEntropy) {
        Ok(report) => {
            println!("Response Bytes: [{}, {}]", report.fixed_response, report.random_response);
            println!("ECC Private Key: {}", report.private_key);
            println!("ECC Public Key: {}", report.public_key);
            println!("Message Signature: {}", report.signature);
            if !report.verified {
                eprintln!("Signature failed to verify.");
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("pipeline failed: {err}");
            std::process::exit(1);
        }
    }
}
