use shadowbox::Config;

fn main() -> anyhow::Result<()> {
    shadowbox::app::run(Config::from_env())
}
