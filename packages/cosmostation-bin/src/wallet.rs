use anyhow::Result;
use cosmostation::{AddressHrp, SeedPhrase};

#[derive(clap::Parser)]
pub(crate) struct Opt {
    #[clap(subcommand)]
    sub: Subcommand,
}

#[derive(clap::Parser)]
enum Subcommand {
    /// Generate wallet
    GenWallet {
        /// Address type, supports any valid Human Readable Part like cosmos or juno
        address_type: AddressHrp,
    },
    /// Print the address for the given phrase
    PrintAddress {
        /// HRP (human readable part) of the address, e.g. juno, cosmos
        hrp: AddressHrp,
        /// Phrase
        phrase: SeedPhrase,
    },
}

pub(crate) fn go(Opt { sub }: Opt) -> Result<()> {
    match sub {
        Subcommand::GenWallet { address_type } => gen_wallet(address_type)?,
        Subcommand::PrintAddress { hrp, phrase } => {
            println!("{}", phrase.with_hrp(hrp)?);
        }
    }
    Ok(())
}

fn gen_wallet(hrp: AddressHrp) -> Result<()> {
    let phrase = SeedPhrase::random()?;
    let wallet = phrase.with_hrp(hrp)?;
    let public_key = hex::encode(wallet.public_key_bytes());
    println!("Mnemonic: {}", phrase.phrase());
    println!("Address: {wallet}");
    println!("Public Key: {public_key}");
    Ok(())
}
