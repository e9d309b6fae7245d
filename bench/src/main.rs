use log::{info, warn};
use std::thread;
use std::time::Instant;
use xlocal::{socketpair, Fd, FdTable, Read, SocketType, Write};

const DATA_SIZE: usize = 64 * 1024 * 1024; // 64 MB
const REPLY_SIZE: usize = 200 * 1024; // 200 KB
const CHUNK_SIZE: usize = 64 * 1024;

fn serve(table: &FdTable, fd: Fd) {
    let file = table.get(fd).expect("Server descriptor vanished");
    let mut stream = &*file;

    info!("Receiving data from client...");
    let start = Instant::now();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut received = 0;
    let mut mismatched = 0;
    while received < DATA_SIZE {
        let n = stream.read(&mut chunk).expect("Failed to read");
        if n == 0 {
            warn!("Client closed early after {} bytes", received);
            break;
        }
        mismatched += chunk[..n].iter().filter(|&&b| b != 0xAB).count();
        received += n;
    }
    let elapsed = start.elapsed();

    if mismatched == 0 {
        info!("Data matches exactly");
    } else {
        info!("Data does not match ({} bytes differ)", mismatched);
    }
    info!("=== Receive Complete ===");
    info!("Total received: {} MB", received / 1024 / 1024);
    info!("Time: {:.2} seconds", elapsed.as_secs_f64());
    info!(
        "Speed: {:.2} MB/s",
        (received as f64 / 1024.0 / 1024.0) / elapsed.as_secs_f64()
    );

    info!("Sending {} KB of data back...", REPLY_SIZE / 1024);
    stream
        .write_all(&vec![0xCD; REPLY_SIZE])
        .expect("Failed to send reply");

    drop(file);
    table.close(fd).expect("Failed to close server descriptor");
    info!("Server side closed");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let table = FdTable::default();
    let [client_fd, server_fd] =
        socketpair(&table, SocketType::Stream, 0).expect("Failed to create socket pair");
    info!("Socket pair ready: client fd {}, server fd {}", client_fd, server_fd);

    thread::scope(|s| {
        s.spawn(|| serve(&table, server_fd));

        let file = table.get(client_fd).expect("Client descriptor vanished");
        let mut stream = &*file;

        info!("Sending {} MB of data...", DATA_SIZE / 1024 / 1024);
        let data = vec![0xAB; CHUNK_SIZE];
        let start = Instant::now();
        for _ in 0..DATA_SIZE / CHUNK_SIZE {
            stream.write_all(&data).expect("Failed to send data");
        }
        let elapsed = start.elapsed();

        info!("=== Send Complete ===");
        info!("Total sent: {} MB", DATA_SIZE / 1024 / 1024);
        info!("Time: {:.2} seconds", elapsed.as_secs_f64());
        info!(
            "Speed: {:.2} MB/s",
            (DATA_SIZE as f64 / 1024.0 / 1024.0) / elapsed.as_secs_f64()
        );

        // reads until the server closes its end
        let mut reply = Vec::with_capacity(REPLY_SIZE);
        stream.read_to_end(&mut reply).expect("Failed to receive reply");
        info!("Reply received: {} KB, then end-of-stream", reply.len() / 1024);

        match table.write(client_fd, b"late") {
            Err(err) => info!("Write after peer close: {} (errno {})", err, err.errno()),
            Ok(n) => warn!("Write after peer close unexpectedly queued {} bytes", n),
        }
    });

    table.close(client_fd).expect("Failed to close client descriptor");
    info!("Open descriptors left: {}", table.open_count());
}
