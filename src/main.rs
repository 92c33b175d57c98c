fn main() {
    cogent_events::cli::run();
}
