fn main() {
    stepscript::cli::run();
}
