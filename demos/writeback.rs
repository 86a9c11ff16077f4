//! Write-back block cache in front of a page server.
//!
//! Spins up an in-process page server over a temp file, then runs a cached
//! page store on top of it: reads fill the cache from the server, writes land
//! in the cache and are marked dirty, and a background flusher drains dirty
//! pages back to the server with `get_dirty` → WRITE → `mark_clean`.
//!
//! Run with: `cargo run --example writeback`

use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagecache::pageserver::{PageClient, PageServer};
use pagecache::policy::lru::LruPolicy;
use pagecache::proto::PAGE_SIZE;
use pagecache::sync::ConcurrentCache;

const PAGES: u64 = 256;
const CACHE_PAGES: usize = 32;

type PageCache = ConcurrentCache<u64, Vec<u8>, LruPolicy>;

fn page_offset(page: u64) -> u64 {
    page * u64::from(PAGE_SIZE)
}

/// Writes through the cache; retries once the flusher has drained room.
fn store_page(cache: &PageCache, page: u64, data: Vec<u8>) {
    loop {
        match cache.upsert(page, data.clone()) {
            Ok(_) => {
                cache.mark_dirty(&page);
                return;
            },
            Err(_) => std::thread::sleep(Duration::from_millis(1)),
        }
    }
}

/// Reads through the cache, filling from the server on a miss.
fn load_page(cache: &PageCache, client: &mut PageClient, page: u64) -> Vec<u8> {
    if let Some(data) = cache.lookup(&page) {
        return data;
    }
    let (_, data) = client
        .read(page_offset(page), PAGE_SIZE)
        .expect("server read");
    // populate on miss; refusal just means the cache is saturated with dirty
    // pages, which the flusher will fix
    let _ = cache.insert(page, data.clone());
    data
}

fn main() {
    let mut path = std::env::temp_dir();
    path.push(format!("pagecache-writeback-demo-{}", std::process::id()));
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .expect("create backing file");
    file.set_len(PAGES * u64::from(PAGE_SIZE))
        .expect("size backing file");

    let server = PageServer::bind("127.0.0.1:0".parse().unwrap(), file).expect("bind");
    let addr = server.local_addr().unwrap();
    std::thread::spawn(move || {
        let _ = server.run();
    });

    let cache: Arc<PageCache> = Arc::new(ConcurrentCache::new(CACHE_PAGES));
    let stop = Arc::new(AtomicBool::new(false));

    // background flusher: drain dirty pages to the server
    let flusher = {
        let cache = Arc::clone(&cache);
        let stop = Arc::clone(&stop);
        let mut client = PageClient::connect(addr).expect("flusher connect");
        std::thread::spawn(move || {
            loop {
                let dirty = cache.get_dirty(8);
                if dirty.is_empty() {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                    continue;
                }
                for page in dirty {
                    // pin while the page is in flight so it cannot be evicted
                    // between the read and the mark_clean
                    if !cache.pin(&page) {
                        continue;
                    }
                    if let Some(data) = cache.peek(&page) {
                        client.write(page_offset(page), &data).expect("flush write");
                        cache.mark_clean(&page);
                    }
                    cache.unpin(&page);
                }
            }
            client.flush().expect("final fsync");
        })
    };

    // workload: stamp every page with a recognizable pattern, re-reading a
    // hot subset along the way
    let mut client = PageClient::connect(addr).expect("connect");
    for page in 0..PAGES {
        let data = vec![(page % 251) as u8; PAGE_SIZE as usize];
        store_page(&cache, page, data);
        if page % 7 == 0 {
            load_page(&cache, &mut client, page / 2);
        }
    }

    stop.store(true, Ordering::Release);
    flusher.join().expect("flusher");

    // verify straight from the server, bypassing the cache
    let mut verified = 0;
    for page in 0..PAGES {
        let (_, data) = client.read(page_offset(page), PAGE_SIZE).expect("verify");
        assert!(
            data.iter().all(|&b| b == (page % 251) as u8),
            "page {page} did not reach the server"
        );
        verified += 1;
    }

    let stats = cache.stats();
    println!("verified {verified}/{PAGES} pages on the server");
    println!(
        "cache: {}/{} resident, {} hits, {} misses, {} evictions, hit ratio {:.2}",
        stats.len,
        stats.capacity,
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.hit_ratio()
    );

    std::fs::remove_file(path).ok();
}
