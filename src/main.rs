fn main() {
    recookie::cli::run();
}
