//! Cascade hooks: derived writes reacting to user writes.
//!
//! Each hook is a leaf policy on top of the watcher engine: it subscribes
//! to a mask over the users namespace and re-enters the router as
//! [`Auth::System`] to update the derived region. Cascades are acyclic -
//! no hook's target matches any hook's mask.

use placehub_core::{
    Auth, ChangeKey, Error, LocPtr, Value, Vfs, Watch, WatchHook, WatchMask, WatchMode,
};

/// Deferred: writing `lat`/`lon`/`time` of a place recomputes its location
/// pointer and appends the visit to the matching `/vmap` bucket. Deferred
/// mode coalesces the three sibling writes of one place into one pass.
pub fn places_watch(cells_per_degree: u32) -> Watch {
    Watch::new(
        "places-watcher",
        WatchMask::parse("/users/*/places/*/*").expect("places mask"),
        WatchMode::Deferred,
        |captured: &[&str]| match captured[2] {
            "lat" | "lon" | "time" => Some(ChangeKey::new([captured[0], captured[1]])),
            _ => None,
        },
        PlacesHook { cells_per_degree },
    )
}

/// Immediate: a chat message updates the recipient's unread marker for the
/// sender, keeping the newest message time.
pub fn chats_watch() -> Watch {
    Watch::new(
        "chats-watcher",
        WatchMask::parse("/users/*/chats/*/*/text").expect("chats mask"),
        WatchMode::Immediate,
        |captured: &[&str]| Some(ChangeKey::new(captured.iter().copied())),
        ChatsHook,
    )
}

/// Immediate: a feedback entry lands in the daily feedback index.
pub fn feedbacks_watch() -> Watch {
    Watch::new(
        "feedbacks-watcher",
        WatchMask::parse("/users/*/feedbacks/*").expect("feedbacks mask"),
        WatchMode::Immediate,
        |captured: &[&str]| Some(ChangeKey::new(captured.iter().copied())),
        FeedbacksHook,
    )
}

/// Immediate: a report from u1 about u2 lands in u2's inbox keyed by u1,
/// stamped with the server receipt time.
pub fn reports_watch() -> Watch {
    Watch::new(
        "reports-watcher",
        WatchMask::parse("/users/*/reports/*").expect("reports mask"),
        WatchMode::Immediate,
        |captured: &[&str]| Some(ChangeKey::new(captured.iter().copied())),
        ReportsHook,
    )
}

struct PlacesHook {
    cells_per_degree: u32,
}

impl WatchHook for PlacesHook {
    fn on_changed(&self, vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error> {
        for change in changes {
            if let Err(err) = self.bucket_visit(vfs, change) {
                log::warn!("places-watcher {:?} failed: {}", change.parts(), err);
            }
        }
        Ok(())
    }
}

impl PlacesHook {
    fn bucket_visit(&self, vfs: &Vfs, change: &ChangeKey) -> Result<(), Error> {
        let [uid, tskey] = change.parts() else {
            return Ok(());
        };
        let base = format!("/users/{}/places/{}", uid, tskey);
        let lat = vfs.get(&Auth::System, &format!("{}/lat", base))?;
        let lon = vfs.get(&Auth::System, &format!("{}/lon", base))?;
        let time = vfs.get(&Auth::System, &format!("{}/time", base))?;
        // An incomplete record is not a visit yet; the write of the missing
        // leaf re-triggers this hook.
        let (Some(lat), Some(lon), Some(_time)) = (lat, lon, time) else {
            return Ok(());
        };
        let (Some(lat), Some(lon)) = (lat.as_f64(), lon.as_f64()) else {
            return Ok(());
        };
        let ptr = LocPtr::encode(lat, lon, self.cells_per_degree);
        log::debug!("visit by {} in cell {}", uid, ptr);
        let entry = Value::from_json(&serde_json::json!({
            "uid": uid, "tskey": tskey,
        }));
        vfs.add(&Auth::System, &format!("/vmap/{}", ptr), entry)
    }
}

struct ChatsHook;

impl WatchHook for ChatsHook {
    fn on_changed(&self, vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error> {
        for change in changes {
            if let Err(err) = Self::mark_unread(vfs, change) {
                log::warn!("chats-watcher {:?} failed: {}", change.parts(), err);
            }
        }
        Ok(())
    }
}

impl ChatsHook {
    fn mark_unread(vfs: &Vfs, change: &ChangeKey) -> Result<(), Error> {
        let [from, to, time] = change.parts() else {
            return Ok(());
        };
        let marker = format!("/users/{}/unread/{}", to, from);
        let prev = vfs.get(&Auth::System, &marker)?;
        let newer = match &prev {
            Some(Value::String(prev_time)) => prev_time < time,
            _ => true,
        };
        if newer {
            log::debug!("new unread message from {} to {} at {}", from, to, time);
            vfs.set(&Auth::System, &marker, Value::from(time.as_str()))?;
        }
        Ok(())
    }
}

struct FeedbacksHook;

impl WatchHook for FeedbacksHook {
    fn on_changed(&self, vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error> {
        for change in changes {
            let [uid, time] = change.parts() else {
                continue;
            };
            log::debug!("new feedback from {} at {}", uid, time);
            let path = format!("/feedbacks/{}", time);
            if let Err(err) = vfs.set(&Auth::System, &path, Value::from(uid.as_str())) {
                log::warn!("feedbacks-watcher {:?} failed: {}", change.parts(), err);
            }
        }
        Ok(())
    }
}

struct ReportsHook;

impl WatchHook for ReportsHook {
    fn on_changed(&self, vfs: &Vfs, changes: &[ChangeKey]) -> Result<(), Error> {
        for change in changes {
            let [reporter, reported] = change.parts() else {
                continue;
            };
            let time = chrono::Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string();
            log::debug!("new report from {} about {} at {}", reporter, reported, time);
            let path = format!("/reports/{}/{}", reported, reporter);
            if let Err(err) = vfs.set(&Auth::System, &path, Value::from(time)) {
                log::warn!("reports-watcher {:?} failed: {}", change.parts(), err);
            }
        }
        Ok(())
    }
}
