use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::connection::Connection;
use super::{Destination, Stream};


struct Idle {
    since: Instant,
    conn: Connection<Stream>,
}

/// Idle keep-alive connections grouped by destination
///
/// Only connections with no request in flight are stored here. The most
/// recently returned connection is handed out first, the oldest one is
/// evicted when the destination is over the limit. Connections idle for
/// longer than `idle_timeout` are closed on the next checkout or checkin
/// to any destination.
pub struct Pool {
    idle: HashMap<Destination, VecDeque<Idle>>,
    max_idle: usize,
    idle_timeout: Duration,
}

impl Pool {
    pub fn new(max_idle: usize, idle_timeout: Duration) -> Pool {
        Pool {
            idle: HashMap::new(),
            max_idle: max_idle,
            idle_timeout: idle_timeout,
        }
    }
    /// Takes a usable idle connection for the destination
    ///
    /// Connections closed by the peer while idle are dropped. Must be
    /// called from within a task.
    pub fn checkout(&mut self, dest: &Destination)
        -> Option<Connection<Stream>>
    {
        self.expire(Instant::now());
        loop {
            let entry = match self.idle.get_mut(dest) {
                Some(list) => list.pop_back(),
                None => return None,
            };
            let mut conn = match entry {
                Some(entry) => entry.conn,
                None => {
                    self.idle.remove(dest);
                    return None;
                }
            };
            match conn.probe_idle() {
                Ok(true) => {
                    trace!("Reusing connection {} to {}", conn.id(), dest);
                    return Some(conn);
                }
                Ok(false) => {}
                Err(e) => {
                    debug!("Idle connection {} to {} failed: {}",
                        conn.id(), dest, e);
                }
            }
        }
    }
    /// Returns connection to the pool
    pub fn checkin(&mut self, dest: Destination, conn: Connection<Stream>) {
        let now = Instant::now();
        self.expire(now);
        if self.max_idle == 0 {
            return;
        }
        trace!("Connection {} to {} is idle", conn.id(), dest);
        let list = self.idle.entry(dest).or_insert_with(VecDeque::new);
        list.push_back(Idle { since: now, conn: conn });
        while list.len() > self.max_idle {
            if let Some(old) = list.pop_front() {
                debug!("Evicting idle connection {}", old.conn.id());
            }
        }
    }
    /// Closes connections which were idle for too long
    pub fn expire(&mut self, now: Instant) {
        let timeout = self.idle_timeout;
        self.idle.retain(|dest, list| {
            // oldest entries are at the front
            while let Some(since) = list.front().map(|x| x.since) {
                if now.duration_since(since) <= timeout {
                    break;
                }
                if let Some(old) = list.pop_front() {
                    debug!("Idle connection {} to {} expired",
                        old.conn.id(), dest);
                }
            }
            !list.is_empty()
        });
    }
    /// Number of idle connections to the destination
    pub fn idle_count(&self, dest: &Destination) -> usize {
        self.idle.get(dest).map(|x| x.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use futures::future::lazy;
    use tokio_core::reactor::Core;

    use super::Pool;
    use crate::client::{Destination, Stream};
    use crate::connection::Connection;
    use crate::mock::MockData;

    #[test]
    fn lifo_and_eviction() {
        let mut core = Core::new().unwrap();
        let handle = core.handle();
        let dest = Destination::new("localhost", 80, false);
        let mut pool = Pool::new(2, Duration::from_secs(60));
        let conns: Vec<_> = (0..3).map(|_| {
            Connection::new(Stream::new(MockData::new()), &handle, None)
        }).collect();
        let ids: Vec<_> = conns.iter().map(|c| c.id()).collect();
        for conn in conns {
            pool.checkin(dest.clone(), conn);
        }
        assert_eq!(pool.idle_count(&dest), 2);
        core.run(lazy(|| {
            assert_eq!(pool.checkout(&dest).map(|c| c.id()), Some(ids[2]));
            assert_eq!(pool.checkout(&dest).map(|c| c.id()), Some(ids[1]));
            assert!(pool.checkout(&dest).is_none());
            Ok::<(), ()>(())
        })).unwrap();
        assert_eq!(pool.idle_count(&dest), 0);
    }

    #[test]
    fn closed_while_idle() {
        let mut core = Core::new().unwrap();
        let handle = core.handle();
        let dest = Destination::new("localhost", 80, false);
        let mut pool = Pool::new(2, Duration::from_secs(60));
        let mock = MockData::new();
        pool.checkin(dest.clone(),
            Connection::new(Stream::new(mock.clone()), &handle, None));
        mock.close_input();
        core.run(lazy(|| {
            assert!(pool.checkout(&dest).is_none());
            Ok::<(), ()>(())
        })).unwrap();
    }

    #[test]
    fn unsolicited_bytes() {
        let mut core = Core::new().unwrap();
        let handle = core.handle();
        let dest = Destination::new("localhost", 80, false);
        let mut pool = Pool::new(2, Duration::from_secs(60));
        let mock = MockData::new();
        pool.checkin(dest.clone(),
            Connection::new(Stream::new(mock.clone()), &handle, None));
        mock.add_input("HTTP/1.1 408 Request Timeout\r\n\r\n");
        core.run(lazy(|| {
            assert!(pool.checkout(&dest).is_none());
            Ok::<(), ()>(())
        })).unwrap();
    }

    #[test]
    fn disabled() {
        let core = Core::new().unwrap();
        let dest = Destination::new("localhost", 80, false);
        let mut pool = Pool::new(0, Duration::from_secs(60));
        pool.checkin(dest.clone(),
            Connection::new(Stream::new(MockData::new()), &core.handle(),
                            None));
        assert_eq!(pool.idle_count(&dest), 0);
    }

    #[test]
    fn idle_timeout() {
        let core = Core::new().unwrap();
        let handle = core.handle();
        let a = Destination::new("a.example.com", 80, false);
        let b = Destination::new("b.example.com", 80, false);
        let mut pool = Pool::new(2, Duration::from_secs(10));
        pool.checkin(a.clone(),
            Connection::new(Stream::new(MockData::new()), &handle, None));
        pool.checkin(b.clone(),
            Connection::new(Stream::new(MockData::new()), &handle, None));
        pool.expire(Instant::now() + Duration::from_secs(5));
        assert_eq!(pool.idle_count(&a), 1);
        assert_eq!(pool.idle_count(&b), 1);
        pool.expire(Instant::now() + Duration::from_secs(11));
        assert_eq!(pool.idle_count(&a), 0);
        assert_eq!(pool.idle_count(&b), 0);
    }

    #[test]
    fn checkin_expires_other_destinations() {
        let core = Core::new().unwrap();
        let handle = core.handle();
        let a = Destination::new("a.example.com", 80, false);
        let b = Destination::new("b.example.com", 80, false);
        let mut pool = Pool::new(2, Duration::from_millis(0));
        pool.checkin(a.clone(),
            Connection::new(Stream::new(MockData::new()), &handle, None));
        ::std::thread::sleep(Duration::from_millis(5));
        pool.checkin(b.clone(),
            Connection::new(Stream::new(MockData::new()), &handle, None));
        assert_eq!(pool.idle_count(&a), 0);
        assert_eq!(pool.idle_count(&b), 1);
    }
}
