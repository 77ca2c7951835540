use vergen::{BuildBuilder, CargoBuilder, Emitter};
use vergen_git2::Git2Builder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_date(true).build()?;
    let cargo = CargoBuilder::default().target_triple(true).build()?;

    // Crates.io tarballs carry no git metadata; fall back to placeholders.
    let git2 = Git2Builder::default()
        .sha(true)
        .describe(true, true, None)
        .build();

    let mut emitter = Emitter::default();
    emitter.add_instructions(&build)?.add_instructions(&cargo)?;

    match git2 {
        Ok(git2) => {
            emitter.add_instructions(&git2)?.emit()?;
        }
        Err(_) => {
            println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
            println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE=unknown");
            emitter.emit()?;
        }
    }

    Ok(())
}
