fn main() -> Result<(), Box<dyn std::error::Error>> {
    hfdeck::cli::main()
}
