fn main() {
    println!("Home Rover – Demo Binaries:");
    println!("  cargo run --bin demo_goto         # Navigate to a room under noise");
    println!("  cargo run --bin demo_fetch        # Fetch an item across rooms");
    println!();
    println!("Run experiments:");
    println!("  cargo run --bin run_experiments");
}
