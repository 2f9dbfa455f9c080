// Copyright 2024 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Connects to the test datacenter, performs the handshake, and prints
//! the nearest-datacenter reply the session's bootstrap asks for.
//!
//! ```sh
//! cargo run --example nearest_dc
//! ```

use ferrogram_crypto::rsa;
use ferrogram_session::net::TcpTransport;
use ferrogram_session::{Event, Handled, Session, SessionOptions};
use ferrogram_tl_types::Object;
use tokio::sync::mpsc;

/// The public RSA key of the test datacenters.
const TEST_DC_KEY: &str = "25342889448840415564971689590713473206898847759084779052582026594546022463853940585885215951168491965708222649399180603818074200620463776135424884632162512403163793083921641631564740959529419359595852941166848940585952337613333022396096584117954892216031229237302943701877588456738335398602461675225081791820393153757504952636234951323237820036543581047826906120927972487366805292115792231423684261262330394324750785450942589751755390156647751460719351439969059949569615302809050721500330239005077889855323917509948255722081644689442127297605422579707142646660768825302832201908302295573257427896031830742328565032949";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()?;

    let transport = TcpTransport::connect("149.154.167.40:443".parse()?).await?;
    let (mut session, handle) = Session::new(
        transport,
        SessionOptions {
            pub_key: rsa::Key::new(TEST_DC_KEY, "65537").expect("the key constants are valid"),
            // Obtain your own values from https://my.telegram.org.
            api_id: 12345,
            api_hash: "0123456789abcdef0123456789abcdef".to_string(),
            verbose: 2,
        },
    );

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    session.add_handler(move |event| match event {
        Event::Object(Object::NearestDc(dc)) => {
            println!(
                "country {:?}, connected to dc {}, nearest dc {}",
                dc.country, dc.this_dc, dc.nearest_dc
            );
            let _ = done_tx.send(());
            Ok(Handled::Replies(Vec::new()))
        }
        _ => Ok(Handled::NotHandled),
    });

    let run = tokio::spawn(session.run());
    done_rx.recv().await;
    handle.close().await;
    run.await??;
    Ok(())
}
